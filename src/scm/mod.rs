pub mod diff;
pub mod git;
pub mod svn;

use chrono::{DateTime, Duration, Utc};

use crate::runner::CommandRunner;
use crate::types::LogEntry;

/// Advisory sink receiving the timestamp of each processed entry.
/// Implementations must not affect collection behavior.
pub trait ProgressSink {
    fn update(&mut self, date: DateTime<Utc>);
}

/// A line stream of raw SCM command output. Owned strings so the parsing
/// iterators carry no borrow of the command buffer.
pub type RawLines<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// One SCM backend: builds the log command line for a date range and
/// turns the raw output into normalized rows.
///
/// The returned iterator is a single forward pass — one buffered entry
/// in flight at a time, entries yielded one revision's paths at a time.
/// Entry-level failures (malformed XML, missing date, unrecognized
/// boolean) are logged with the revision context and the entry skipped,
/// so one bad entry never aborts the stream.
pub trait LogCollector {
    /// Client argv for retrieving the log between `after` and `before`
    /// (`before` of `None` means up to the latest revision).
    fn log_command(&self, after: DateTime<Utc>, before: Option<DateTime<Utc>>) -> Vec<String>;

    /// Lazily parse raw output lines into normalized rows.
    fn get_log_entries<'a>(&self, lines: RawLines<'a>) -> Box<dyn Iterator<Item = LogEntry> + 'a>;
}

/// Applies the default date range: `after` falls back to one year before
/// `now`, `before` stays open-ended.
pub fn handle_default_dates(
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
    (after.unwrap_or(now - Duration::days(365)), before)
}

/// Shared orchestration for both backends: resolve the date range, run
/// the client, and drain the entry stream into a table, feeding the
/// optional progress sink along the way.
///
/// Failures of the primary log command propagate; this is not a
/// best-effort path.
pub fn get_log(
    collector: &dyn LogCollector,
    runner: &dyn CommandRunner,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    mut progress: Option<&mut dyn ProgressSink>,
) -> Result<Vec<LogEntry>, String> {
    let (after, before) = handle_default_dates(after, before, now);
    let argv = collector.log_command(after, before);
    let output = runner.run(&argv).map_err(|e| e.to_string())?;
    let lines: RawLines<'_> = Box::new(output.lines().map(str::to_owned));
    let mut entries = Vec::new();
    for entry in collector.get_log_entries(lines) {
        if let Some(sink) = progress.as_deref_mut() {
            sink.update(entry.date);
        }
        entries.push(entry);
    }
    Ok(entries)
}
