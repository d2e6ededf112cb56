use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::runner::CommandRunner;
use crate::scm::{LogCollector, RawLines};
use crate::types::{DownloadResult, LogEntry};

// Header format: [hash] [author] [date] [subject]. The subject is last
// and greedy so brackets inside commit messages don't break the match.
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\] \[([^\]]*)\] \[([^\]]+)\] \[(.*)\]$").unwrap());

// Rename notation inside a numstat path: "dir/{old => new}/file".
static RENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*) => ([^{}]*)\}").unwrap());

/// Parses a `git log --date=iso` timestamp (e.g. `2018-12-05 23:44:38 -0000`),
/// normalized to UTC.
pub fn to_date(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("cannot interpret '{value}' as a date: {e}"))
}

/// Resolves git's rename notation to (new path, old path).
/// `dir/{b/a.py => a/b.py}` becomes (`dir/a/b.py`, Some(`dir/b/a.py`));
/// a plain path comes back unchanged with no old path.
fn normalize_path(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    if raw.contains('{') && raw.contains("=>") {
        let new = RENAME_RE.replace(raw, "$2").replace("//", "/");
        let old = RENAME_RE.replace(raw, "$1").replace("//", "/");
        return (new.trim().to_string(), Some(old.trim().to_string()));
    }
    if let Some((old, new)) = raw.split_once(" => ") {
        return (new.trim().to_string(), Some(old.trim().to_string()));
    }
    (raw.to_string(), None)
}

/// Log collector for `git log --pretty=... --numstat` output: one
/// bracketed header line per commit followed by one
/// `added<TAB>removed<TAB>path` line per touched file.
pub struct GitLogCollector {
    client: String,
}

impl GitLogCollector {
    pub fn new(client: &str) -> Self {
        GitLogCollector {
            client: client.to_string(),
        }
    }
}

impl LogCollector for GitLogCollector {
    fn log_command(&self, after: DateTime<Utc>, before: Option<DateTime<Utc>>) -> Vec<String> {
        let mut argv = vec![
            self.client.clone(),
            "log".into(),
            "--pretty=format:[%h] [%an] [%ad] [%s]".into(),
            "--date=iso".into(),
            "--numstat".into(),
            "--after".into(),
            format!("{}", after.format("%Y-%m-%d")),
        ];
        if let Some(b) = before {
            argv.push("--before".into());
            argv.push(format!("{}", b.format("%Y-%m-%d")));
        }
        argv.push(".".into());
        argv
    }

    fn get_log_entries<'a>(&self, lines: RawLines<'a>) -> Box<dyn Iterator<Item = LogEntry> + 'a> {
        Box::new(GitLogStream {
            lines,
            current: None,
        })
    }
}

// ─── Stream parsing ───────────────────────────────────────────────────────────

struct CommitHeader {
    revision: String,
    author: Option<String>,
    date: DateTime<Utc>,
    message: Option<String>,
}

/// Single pass over the numstat stream; the working set is the current
/// commit header. Each numstat line yields one row immediately.
struct GitLogStream<'a> {
    lines: RawLines<'a>,
    current: Option<CommitHeader>,
}

impl Iterator for GitLogStream<'_> {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        loop {
            let line = self.lines.next()?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(caps) = HEADER_RE.captures(trimmed) {
                let date = match to_date(&caps[3]) {
                    Ok(d) => d,
                    Err(e) => {
                        log::warn!("skipping commit {}: {e}", &caps[1]);
                        self.current = None;
                        continue;
                    }
                };
                self.current = Some(CommitHeader {
                    revision: caps[1].to_string(),
                    author: Some(caps[2].to_string()).filter(|a| !a.is_empty()),
                    date,
                    message: Some(caps[4].replace('\n', " ")),
                });
                continue;
            }
            let Some(header) = &self.current else {
                // numstat line before any header; nothing to attach it to
                log::warn!("ignoring unattached numstat line: {trimmed}");
                continue;
            };
            let mut parts = trimmed.splitn(3, '\t');
            let (Some(added_raw), Some(removed_raw), Some(raw_path)) =
                (parts.next(), parts.next(), parts.next())
            else {
                log::warn!("ignoring malformed numstat line: {trimmed}");
                continue;
            };
            // Binary files report "-" for both counts; keep them unknown.
            let added = added_raw.trim().parse::<u64>().ok();
            let removed = removed_raw.trim().parse::<u64>().ok();
            let (path, copyfrom_path) = normalize_path(raw_path);
            return Some(LogEntry {
                revision: header.revision.clone(),
                author: header.author.clone(),
                date: header.date,
                path,
                message: header.message.clone(),
                textmods: added.is_some(),
                kind: "f".to_string(),
                action: None,
                propmods: false,
                copyfrom_rev: None,
                copyfrom_path,
                added,
                removed,
            });
        }
    }
}

// ─── Downloads ────────────────────────────────────────────────────────────────

/// Downloads one file at one revision (`git show REV:PATH`).
pub fn download_file(
    runner: &dyn CommandRunner,
    revision: &str,
    path: &str,
    client: &str,
) -> Result<DownloadResult, String> {
    let argv = vec![
        client.to_string(),
        "show".to_string(),
        format!("{revision}:{path}"),
    ];
    let content = runner.run(&argv).map_err(|e| e.to_string())?;
    Ok(DownloadResult {
        revision: revision.to_string(),
        path: Some(path.to_string()),
        content,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
