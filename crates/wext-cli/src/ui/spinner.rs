use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;

use super::paint;

/// Spinner for the build phase, updated with `[i/n] names` as groups build.
///
/// Hidden when stderr is not a terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if !console::user_attended_stderr() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Stop with a green check mark.
    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(format!(
            "{} {}",
            paint("✓", |t| t.green().to_string()),
            message
        ));
    }

    /// Stop with a red cross.
    pub fn fail(&self, message: &str) {
        self.pb.finish_with_message(format!(
            "{} {}",
            paint("✗", |t| t.red().to_string()),
            message
        ));
    }
}
