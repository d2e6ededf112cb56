use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use crate::scm::ProgressSink;

/// Progress bar over the requested date range, fed by the timestamp of
/// each processed log entry. Entries arrive newest first or oldest
/// first depending on the backend, so the position is set absolutely
/// rather than incremented.
pub struct DateProgress {
    bar: ProgressBar,
    after: DateTime<Utc>,
    total_days: u64,
}

impl DateProgress {
    pub fn new(after: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total_days = (now - after).num_days().max(1) as u64;
        let bar = ProgressBar::new(total_days);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} days")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message("scanning log");
        DateProgress {
            bar,
            after,
            total_days,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for DateProgress {
    fn update(&mut self, date: DateTime<Utc>) {
        let days = (date - self.after).num_days().clamp(0, self.total_days as i64) as u64;
        self.bar.set_position(days);
    }
}
