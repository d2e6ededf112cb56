use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{AgeRow, LogEntry};

/// Age in fractional days of the last recorded change of each path,
/// relative to a single `now` captured by the caller. Passing `now`
/// in keeps a whole report consistent and the results reproducible.
pub fn get_ages(entries: &[LogEntry], now: DateTime<Utc>) -> Vec<AgeRow> {
    let mut last_change: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
    for entry in entries {
        last_change
            .entry(entry.path.as_str())
            .and_modify(|d| {
                if entry.date > *d {
                    *d = entry.date;
                }
            })
            .or_insert(entry.date);
    }
    last_change
        .into_iter()
        .map(|(path, last)| AgeRow {
            path: path.to_string(),
            age_days: (now - last).num_milliseconds() as f64 / 86_400_000.0,
        })
        .collect()
}
