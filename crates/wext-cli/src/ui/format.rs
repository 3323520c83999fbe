//! Formatting utilities for sizes, durations and the build summary.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;

use super::paint;

/// Format a byte count with the most fitting unit.
///
/// ```
/// use wext_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration as `ms`, seconds or `m s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print every output file with its size, then the total, to stderr.
///
/// `entries` are `(path relative to the output directory, size in bytes)`.
pub fn print_build_summary(out_dir: &str, entries: &[(String, u64)]) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);

    eprintln!("\n{}", paint(out_dir, |t| t.bold().underline().to_string()));
    eprintln!("{}", "─".repeat(width));
    for (name, size) in entries {
        eprintln!(
            "  {} {} {}",
            paint("▸", |t| t.blue().to_string()),
            paint(name, |t| t.bright_white().bold().to_string()),
            paint(&format_size(*size), |t| t.dimmed().to_string())
        );
    }
    eprintln!("{}", "─".repeat(width));

    let total: u64 = entries.iter().map(|(_, size)| size).sum();
    eprintln!(
        "  {} {} in {} files",
        paint("Total:", |t| t.bold().to_string()),
        paint(&format_size(total), |t| t.green().to_string()),
        entries.len()
    );
}
