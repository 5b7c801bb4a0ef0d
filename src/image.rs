use std::path::Path;

use crate::runner::{Exec, FailurePolicy, ProcessRunner};
use crate::ui;

const RUNTIME: &str = "podman";

/// Builds the Jupyter Lab image from the project directory.
pub struct ImageBuilder<'a, E> {
    runner: &'a ProcessRunner<E>,
    image: &'a str,
    context_dir: &'a Path,
}

impl<'a, E: Exec> ImageBuilder<'a, E> {
    pub fn new(runner: &'a ProcessRunner<E>, image: &'a str, context_dir: &'a Path) -> Self {
        Self {
            runner,
            image,
            context_dir,
        }
    }

    /// Whether the local image store already holds the tag.
    pub async fn image_present(&self) -> bool {
        self.runner
            .query(&[RUNTIME, "images", "-q", self.image])
            .await
            .is_some_and(|out| out.success && !out.stdout.trim().is_empty())
    }

    /// Make sure the image exists, building it when missing or when `force`
    /// is set. Build failures are tolerated and reported as `false`.
    pub async fn ensure_image(&self, force: bool) -> bool {
        ui::heading("Building container image...");

        if !force && self.image_present().await {
            tracing::info!(image = %self.image, "image present, skipping build");
            ui::success("Image already exists (use --rebuild to force)");
            return true;
        }

        let context = self.context_dir.to_string_lossy();
        tracing::info!(image = %self.image, context = %context, force, "building image");
        let spinner = ui::spinner("Building...");
        let built = self
            .runner
            .run_with_spinner(
                &[RUNTIME, "build", "-t", self.image, context.as_ref()],
                "Failed to build image",
                FailurePolicy::Tolerate,
                &spinner,
            )
            .await;

        // Tolerate never yields an Err
        let built = built.unwrap_or(false);
        if built {
            ui::success("Image built successfully");
        }
        built
    }
}
