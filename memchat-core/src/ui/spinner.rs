//! Progress spinner shown while the summary model works

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Start a spinner on stderr with the given message
    pub fn new(message: &str) -> Self {
        Self::with_target(message, ProgressDrawTarget::stderr())
    }

    /// Spinner that draws nowhere, for non-interactive output
    pub fn hidden(message: &str) -> Self {
        Self::with_target(message, ProgressDrawTarget::hidden())
    }

    fn with_target(message: &str, target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(None, target);
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.tick();
        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }

    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
