use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ui;

/// Tally of what a preparation step did. Failures are counted, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub created: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PrepareReport {
    fn absorb(&mut self, other: PrepareReport) {
        self.created += other.created;
        self.copied += other.copied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Write `contents` to `path` through a temp file in the same directory, so
/// a half-written file never replaces the previous one.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create each directory with its parents. One failure does not stop the rest.
pub fn ensure_directories(dirs: &[PathBuf]) -> PrepareReport {
    let mut report = PrepareReport::default();
    for dir in dirs {
        match fs::create_dir_all(dir) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "directory ready");
                ui::success(&dir.display().to_string());
                report.created += 1;
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to create directory");
                ui::warning(&format!("Failed to create {}: {}", dir.display(), e));
                report.failed += 1;
            }
        }
    }
    report
}

/// Place template files and directory trees at their destinations.
///
/// A file is copied only when its destination does not exist yet. A
/// directory is merged into its destination: missing files are added,
/// existing ones are left alone. Missing sources are skipped quietly.
pub fn ensure_templates(pairs: &[(PathBuf, PathBuf)]) -> PrepareReport {
    let mut report = PrepareReport::default();
    for (src, dest) in pairs {
        if !src.exists() {
            tracing::debug!(src = %src.display(), "template source absent");
            continue;
        }

        if src.is_dir() {
            let mut tree = PrepareReport::default();
            match merge_tree(src, dest, &mut tree) {
                Ok(()) => {
                    tracing::info!(
                        dest = %dest.display(),
                        copied = tree.copied,
                        kept = tree.skipped,
                        failed = tree.failed,
                        "template tree merged"
                    );
                    if tree.failed == 0 {
                        ui::success(&format!("Merged {} into {}", file_label(src), dest.display()));
                    } else {
                        ui::warning(&format!(
                            "Merged {} into {} with {} failure(s)",
                            file_label(src),
                            dest.display(),
                            tree.failed
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(src = %src.display(), error = %e, "template tree merge failed");
                    ui::warning(&format!("Failed to copy {}: {}", file_label(src), e));
                    tree.failed += 1;
                }
            }
            report.absorb(tree);
            continue;
        }

        if dest.exists() {
            report.skipped += 1;
            continue;
        }

        let copied = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::copy(src, dest).map(|_| ()));
        match copied {
            Ok(()) => {
                tracing::info!(dest = %dest.display(), "template copied");
                ui::success(&format!("Copied {} to {}", file_label(src), dest.display()));
                report.copied += 1;
            }
            Err(e) => {
                tracing::warn!(src = %src.display(), error = %e, "template copy failed");
                ui::warning(&format!("Failed to copy {}: {}", file_label(src), e));
                report.failed += 1;
            }
        }
    }
    report
}

/// Recursively copy `src` into `dest` without overwriting or removing
/// anything already under `dest`.
///
/// Only failing to create `dest` or to list `src` is returned as an error.
/// A failure on a single entry is logged, counted in `report.failed`, and
/// the remaining entries are still merged.
pub fn merge_tree(src: &Path, dest: &Path, report: &mut PrepareReport) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(src = %src.display(), error = %e, "cannot read template entry");
                report.failed += 1;
                continue;
            }
        };
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let merged = match entry.file_type() {
            Ok(kind) if kind.is_dir() => merge_tree(&from, &to, report),
            Ok(_) if to.exists() => {
                report.skipped += 1;
                Ok(())
            }
            Ok(_) => fs::copy(&from, &to).map(|_| report.copied += 1),
            Err(e) => Err(e),
        };
        if let Err(e) = merged {
            tracing::warn!(src = %from.display(), dest = %to.display(), error = %e, "template entry not copied");
            ui::warning(&format!("Failed to copy {}: {}", file_label(&from), e));
            report.failed += 1;
        }
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
