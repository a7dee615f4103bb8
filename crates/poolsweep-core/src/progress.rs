//! Live progress over an observation window.

use crate::metrics::MetricsSnapshot;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Progress bar showing ticks sampled so far and the latest sample.
///
/// Example output:
/// ```text
///   ⠋ memory R 0/0 W 412345/0    ████████░░░░░░░░░░░░  12/60
/// ```
pub struct TickProgress {
    progress: ProgressBar,
    label: String,
}

impl TickProgress {
    /// Start a bar over `ticks` samples. A disabled bar draws nothing.
    pub fn new(label: &str, ticks: u32, enabled: bool) -> Self {
        let progress = if enabled {
            ProgressBar::new(u64::from(ticks))
        } else {
            ProgressBar::hidden()
        };

        let style = ProgressStyle::default_bar()
            .template("  {spinner:.cyan} {msg:<32}  {bar:20.cyan/dim} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
            .tick_strings(TICK_STRINGS);
        progress.set_style(style);
        progress.set_message(format!("{label} observing"));
        if enabled {
            progress.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            progress,
            label: label.to_string(),
        }
    }

    /// Record one sampled tick.
    pub fn tick(&self, snapshot: &MetricsSnapshot) {
        self.progress.set_message(format!(
            "{} R {}/{} W {}/{}",
            self.label,
            snapshot.read_ops,
            snapshot.read_errors,
            snapshot.write_ops,
            snapshot.write_errors
        ));
        self.progress.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.progress.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.progress.finish_and_clear();
    }
}

impl Drop for TickProgress {
    fn drop(&mut self) {
        if !self.progress.is_finished() {
            self.progress.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_counts_ticks() {
        let progress = TickProgress::new("memory", 3, false);
        progress.tick(&MetricsSnapshot::default());
        progress.tick(&MetricsSnapshot::default());
        assert_eq!(progress.position(), 2);
        progress.finish();
    }

    #[test]
    fn test_message_before_first_tick_says_observing() {
        let progress = TickProgress::new("sqlite", 5, false);
        assert_eq!(progress.progress.message(), "sqlite observing");

        let snapshot = MetricsSnapshot {
            read_ops: 7,
            read_errors: 1,
            write_ops: 3,
            write_errors: 0,
        };
        progress.tick(&snapshot);
        assert_eq!(progress.progress.message(), "sqlite R 7/1 W 3/0");
    }
}
