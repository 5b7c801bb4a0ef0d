use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Console palette
fn ok_mark() -> ColoredString {
    "\u{2713}".green()
}
fn warn_mark() -> ColoredString {
    "\u{26a0}".yellow()
}
fn fail_mark() -> ColoredString {
    "\u{2717}".red()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Good,
    Warn,
}

pub fn banner(title: &str) {
    panel(None, &[title.bold().to_string()], Tone::Info);
}

pub fn heading(text: &str) {
    println!("\n{}", text.bold());
}

pub fn success(msg: &str) {
    println!("{} {}", ok_mark(), msg);
}

pub fn warning(msg: &str) {
    println!("{} {}", warn_mark(), msg);
}

pub fn failure(msg: &str) {
    println!("{} {}", fail_mark(), msg);
}

/// Dimmed diagnostic text, e.g. captured stderr.
pub fn detail(text: &str) {
    for line in text.lines() {
        println!("  {}", line.dimmed());
    }
}

pub fn hint(command: &str, comment: &str) {
    if comment.is_empty() {
        println!("  {}", command.cyan());
    } else {
        println!("  {:<44} {}", command.cyan(), format!("# {}", comment).dimmed());
    }
}

/// Draw a box around `lines`. Width is measured on the plain text so ANSI
/// escapes do not skew the border.
pub fn panel(title: Option<&str>, lines: &[String], tone: Tone) {
    let width = lines
        .iter()
        .map(|l| visible_width(l))
        .chain(title.map(|t| t.chars().count() + 2))
        .max()
        .unwrap_or(0)
        + 2;

    let paint = |s: String| -> ColoredString {
        match tone {
            Tone::Info => s.blue(),
            Tone::Good => s.green(),
            Tone::Warn => s.yellow(),
        }
    };

    let top = match title {
        Some(t) => {
            let label = format!(" {} ", t);
            let rest = width.saturating_sub(label.chars().count());
            format!("\u{256d}{}{}\u{256e}", label, "\u{2500}".repeat(rest))
        }
        None => format!("\u{256d}{}\u{256e}", "\u{2500}".repeat(width)),
    };
    println!("{}", paint(top));
    for line in lines {
        let pad = width - 1 - visible_width(line);
        println!("{} {}{}{}", paint("\u{2502}".into()), line, " ".repeat(pad), paint("\u{2502}".into()));
    }
    println!("{}", paint(format!("\u{2570}{}\u{256f}", "\u{2500}".repeat(width))));
}

/// Spinner shown while a blocking step runs. Hidden automatically when
/// stdout is not a terminal.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg:.bold.green}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Character count with ANSI escape sequences removed.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in s.chars() {
        match (in_escape, c) {
            (false, '\u{1b}') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => width += 1,
        }
    }
    width
}
