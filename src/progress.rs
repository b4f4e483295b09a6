//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner-based progress for the sequential steps of a comparison
#[derive(Debug)]
pub struct ProgressReporter {
    current: Option<ProgressBar>,
    show_progress: bool,
    start_time: std::time::Instant,
}

impl ProgressReporter {
    pub fn new(show_progress: bool) -> Self {
        Self {
            current: None,
            show_progress,
            start_time: std::time::Instant::now(),
        }
    }

    /// Start a new step, finishing whatever step was running
    pub fn step(&mut self, message: &str) {
        self.finish_current();
        log::debug!("{}", message);
        if self.show_progress {
            self.current = Some(create_spinner(message));
        }
    }

    fn finish_current(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }

    /// Clear any spinner and report the total time taken
    pub fn finish(&mut self) -> Duration {
        self.finish_current();
        let elapsed = self.start_time.elapsed();
        log::debug!("Finished in {:.2?}", elapsed);
        elapsed
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish_current();
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
