//! Status message functions for terminal output.

use owo_colors::OwoColorize;

use super::paint;

pub fn success(message: &str) {
    eprintln!("{} {}", paint("✓", |t| t.green().bold().to_string()), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", paint("ℹ", |t| t.blue().bold().to_string()), message);
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        paint("⚠", |t| t.yellow().bold().to_string()),
        paint(message, |t| t.yellow().to_string())
    );
}

pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        paint("✗", |t| t.red().bold().to_string()),
        paint(message, |t| t.red().to_string())
    );
}
