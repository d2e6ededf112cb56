use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};

use crate::runner::CommandRunner;
use crate::scm::{diff, LogCollector, RawLines};
use crate::types::{DiffChunk, DownloadResult, LogEntry};

/// Parses a Subversion UTC timestamp (e.g. `2018-02-24T11:14:11.000000Z`).
pub fn to_date(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("cannot interpret '{value}' as a date: {e}"))
}

/// Strict three-valued boolean coercion for svn attribute strings.
/// A missing attribute coerces as "" (false); anything outside the two
/// accepted vocabularies is an error naming the offending value.
pub fn to_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "t" => Ok(true),
        "false" | "0" | "f" | "" => Ok(false),
        _ => Err(format!("cannot interpret '{value}' as a bool")),
    }
}

static REL_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Relative URL: \^(.*)$").unwrap());

/// Log collector for Subversion's `svn log --xml -v` output.
///
/// The raw output is a flat line stream, not one document per entry, so
/// entries are reassembled from the `<logentry` / `</logentry>` marker
/// lines before being parsed as standalone XML fragments.
pub struct SvnLogCollector {
    client: String,
    relative_url: Option<String>,
}

impl SvnLogCollector {
    pub fn new(client: &str) -> Self {
        SvnLogCollector {
            client: client.to_string(),
            relative_url: None,
        }
    }

    /// Sets the repository-relative URL (e.g. `/project/trunk`) used to
    /// strip the prefix svn puts on every reported path.
    pub fn with_relative_url(mut self, relative_url: &str) -> Self {
        self.relative_url = Some(relative_url.trim_end_matches('/').to_string());
        self
    }

    /// Discovers the relative URL from `svn info` when none was supplied.
    /// svn reports it as `Relative URL: ^/project/trunk`.
    pub fn update_urls(&mut self, runner: &dyn CommandRunner) -> Result<String, String> {
        if let Some(url) = &self.relative_url {
            return Ok(url.clone());
        }
        let argv: Vec<String> = vec![self.client.clone(), "info".into(), ".".into()];
        let output = runner.run(&argv).map_err(|e| e.to_string())?;
        for line in output.lines() {
            if let Some(caps) = REL_URL_RE.captures(line) {
                let url = caps[1].trim_end_matches('/').to_string();
                self.relative_url = Some(url.clone());
                return Ok(url);
            }
        }
        Err("could not find 'Relative URL:' in svn info output".to_string())
    }
}

impl LogCollector for SvnLogCollector {
    fn log_command(&self, after: DateTime<Utc>, before: Option<DateTime<Utc>>) -> Vec<String> {
        let before_str = match before {
            Some(b) => format!("{{{}}}", b.format("%Y-%m-%d")),
            None => "HEAD".to_string(),
        };
        vec![
            self.client.clone(),
            "log".into(),
            "--xml".into(),
            "-v".into(),
            "-r".into(),
            format!("{{{}}}:{}", after.format("%Y-%m-%d"), before_str),
            ".".into(),
        ]
    }

    fn get_log_entries<'a>(&self, lines: RawLines<'a>) -> Box<dyn Iterator<Item = LogEntry> + 'a> {
        let prefix = match &self.relative_url {
            Some(url) => format!("{url}/"),
            None => String::new(),
        };
        Box::new(SvnLogStream {
            lines,
            state: ScanState::Idle,
            buffer: String::new(),
            prefix,
            pending: VecDeque::new(),
        })
    }
}

// ─── Entry reassembly ─────────────────────────────────────────────────────────

enum ScanState {
    Idle,
    Buffering,
}

/// Single forward pass over the raw line stream. Holds at most one
/// buffered `<logentry>` fragment plus the rows already parsed from it.
struct SvnLogStream<'a> {
    lines: RawLines<'a>,
    state: ScanState,
    buffer: String,
    prefix: String,
    pending: VecDeque<LogEntry>,
}

impl Iterator for SvnLogStream<'_> {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(row);
            }
            let line = self.lines.next()?;
            match self.state {
                ScanState::Idle => {
                    if line.starts_with("<logentry") {
                        self.buffer.clear();
                        self.buffer.push_str(&line);
                        self.buffer.push('\n');
                        self.state = ScanState::Buffering;
                    }
                }
                ScanState::Buffering => {
                    self.buffer.push_str(&line);
                    self.buffer.push('\n');
                    if line.starts_with("</logentry>") {
                        match parse_entry(&self.buffer, &self.prefix) {
                            Ok(rows) => self.pending.extend(rows),
                            Err(e) => log::warn!("skipping log entry: {e}"),
                        }
                        self.state = ScanState::Idle;
                    }
                }
            }
        }
    }
}

fn child_text(elem: Node<'_, '_>, name: &str) -> Option<String> {
    elem.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(str::to_owned)
}

/// Parses one buffered `<logentry>` fragment into its per-path rows.
///
/// A missing date or an unrecognized boolean fails the whole entry (the
/// caller logs and moves on); a path element without text only fails
/// that path, which gets a diagnostic placeholder instead.
fn parse_entry(fragment: &str, prefix: &str) -> Result<Vec<LogEntry>, String> {
    let doc =
        Document::parse(fragment).map_err(|e| format!("malformed <logentry> fragment: {e}"))?;
    let elem = doc.root_element();
    let revision = elem
        .attribute("revision")
        .ok_or("missing revision attribute on <logentry>")?
        .to_string();
    let author = child_text(elem, "author");
    let date_text =
        child_text(elem, "date").ok_or_else(|| format!("missing date in revision {revision}"))?;
    let date = to_date(&date_text).map_err(|e| format!("{e} in revision {revision}"))?;
    let message = child_text(elem, "msg").map(|m| m.replace('\n', " "));

    let mut rows = Vec::new();
    for path_elem in elem.descendants().filter(|n| n.has_tag_name("path")) {
        let textmods = to_bool(path_elem.attribute("text-mods").unwrap_or(""))
            .map_err(|e| format!("{e} in revision {revision}"))?;
        let propmods = to_bool(path_elem.attribute("prop-mods").unwrap_or(""))
            .map_err(|e| format!("{e} in revision {revision}"))?;
        let path = match path_elem.text() {
            Some(text) if !text.is_empty() => {
                if prefix.is_empty() {
                    text.to_string()
                } else {
                    text.replace(prefix, "")
                }
            }
            _ => {
                let msg = format!("no path text processing rev {revision}");
                log::warn!("{msg}");
                msg
            }
        };
        rows.push(LogEntry {
            revision: revision.clone(),
            author: author.clone(),
            date,
            path,
            message: message.clone(),
            textmods,
            kind: path_elem.attribute("kind").unwrap_or("").to_string(),
            action: path_elem.attribute("action").map(str::to_owned),
            propmods,
            copyfrom_rev: path_elem.attribute("copyfrom-rev").map(str::to_owned),
            copyfrom_path: path_elem.attribute("copyfrom-path").map(str::to_owned),
            added: None,
            removed: None,
        });
    }
    Ok(rows)
}

// ─── Downloads and diff stats ─────────────────────────────────────────────────

/// Retrieves file or diff content at a point in history via the svn
/// client. The subcommand is fixed at construction (`cat -r`,
/// `diff --git -c`, ...); revision and optional path are appended.
pub struct SvnDownloader {
    command: Vec<String>,
    client: String,
}

impl SvnDownloader {
    pub fn new(command: &[&str], client: &str) -> Self {
        SvnDownloader {
            command: command.iter().map(|s| s.to_string()).collect(),
            client: client.to_string(),
        }
    }

    pub fn download(
        &self,
        runner: &dyn CommandRunner,
        revision: &str,
        path: Option<&str>,
    ) -> Result<DownloadResult, crate::runner::CommandError> {
        let mut argv = vec![self.client.clone()];
        argv.extend(self.command.iter().cloned());
        argv.push(revision.to_string());
        if let Some(p) = path {
            argv.push(p.to_string());
        }
        let content = runner.run(&argv)?;
        Ok(DownloadResult {
            revision: revision.to_string(),
            path: path.map(str::to_owned),
            content,
        })
    }
}

/// Downloads one file at one revision (`svn cat -r REV PATH`).
pub fn download_file(
    runner: &dyn CommandRunner,
    revision: &str,
    path: &str,
    client: &str,
) -> Result<DownloadResult, String> {
    SvnDownloader::new(&["cat", "-r"], client)
        .download(runner, revision, Some(path))
        .map_err(|e| e.to_string())
}

/// Per-chunk added/removed statistics for one revision's full diff
/// (`svn diff --git -c REV`). Best-effort: a failed diff command is
/// logged and yields zero chunks rather than an error.
pub fn get_diff_stats(runner: &dyn CommandRunner, revision: &str, client: &str) -> Vec<DiffChunk> {
    let downloader = SvnDownloader::new(&["diff", "--git", "-c"], client);
    match downloader.download(runner, revision, None) {
        Ok(downloaded) => diff::parse_diff(&downloaded.content),
        Err(e) => {
            log::warn!("cannot retrieve diff for {revision}: {e}");
            Vec::new()
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandError;
    use chrono::TimeZone;

    struct StubRunner {
        output: Result<String, CommandError>,
    }

    impl StubRunner {
        fn ok(output: &str) -> Self {
            StubRunner {
                output: Ok(output.to_string()),
            }
        }

        fn fail(stderr: &str) -> Self {
            StubRunner {
                output: Err(CommandError {
                    command: "svn".to_string(),
                    status: Some(1),
                    stderr: stderr.to_string(),
                }),
            }
        }
    }

    impl CommandRunner for StubRunner {
        fn run(&self, _argv: &[String]) -> Result<String, CommandError> {
            self.output.clone()
        }
    }

    fn collect(collector: &SvnLogCollector, raw: &str) -> Vec<LogEntry> {
        let lines: RawLines<'_> = Box::new(raw.lines().map(str::to_owned).collect::<Vec<_>>().into_iter());
        collector.get_log_entries(lines).collect()
    }

    const SIMPLE_LOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<log>
<logentry revision="1018">
<author>elmotec</author>
<date>2018-02-24T11:14:11.000000Z</date>
<paths>
<path text-mods="true" kind="file" action="M"
   prop-mods="false">/project/trunk/stats.py</path>
<path text-mods="true" kind="file" action="M"
   prop-mods="false">/project/trunk/requirements.txt</path>
</paths>
<msg>Very descriptive</msg>
</logentry>
</log>
"#;

    #[test]
    fn test_to_bool_accepted_true_values() {
        for v in ["true", "1", "t", "True", "TRUE", "T"] {
            assert_eq!(to_bool(v), Ok(true), "'{v}' must coerce to true");
        }
    }

    #[test]
    fn test_to_bool_accepted_false_values() {
        for v in ["false", "0", "f", "", "False", "F"] {
            assert_eq!(to_bool(v), Ok(false), "'{v}' must coerce to false");
        }
    }

    #[test]
    fn test_to_bool_rejects_everything_else() {
        let err = to_bool("no").expect_err("'no' is not a recognized boolean");
        assert!(err.contains("'no'"), "error must name the offending value: {err}");
        assert!(to_bool("yes").is_err());
        assert!(to_bool("2").is_err());
    }

    #[test]
    fn test_to_date_subversion_format() {
        let date = to_date("2018-02-24T11:14:11.000000Z").expect("valid svn date");
        assert_eq!(date, Utc.with_ymd_and_hms(2018, 2, 24, 11, 14, 11).unwrap());
    }

    #[test]
    fn test_to_date_rejects_garbage() {
        let err = to_date("last tuesday").expect_err("not a date");
        assert!(err.contains("last tuesday"), "error must name the input: {err}");
    }

    #[test]
    fn test_get_log_entries_two_paths() {
        let svn = SvnLogCollector::new("svn").with_relative_url("/project/trunk");
        let entries = collect(&svn, SIMPLE_LOG);
        assert_eq!(entries.len(), 2, "one row per path in the entry");
        let first = &entries[0];
        assert_eq!(first.revision, "1018");
        assert_eq!(first.author.as_deref(), Some("elmotec"));
        assert_eq!(first.path, "stats.py", "relative url prefix must be stripped");
        assert_eq!(first.message.as_deref(), Some("Very descriptive"));
        assert!(first.textmods);
        assert!(!first.propmods);
        assert_eq!(first.kind, "file");
        assert_eq!(first.action.as_deref(), Some("M"));
        assert_eq!(first.added, None, "added is unknown until a diff-stat pass");
        assert_eq!(first.removed, None);
        assert_eq!(entries[1].path, "requirements.txt");
    }

    #[test]
    fn test_get_log_entries_empty_msg_is_none() {
        let svn = SvnLogCollector::new("svn").with_relative_url("/project/trunk");
        let raw = r#"<log>
<logentry revision="1018">
<author>elmotec</author>
<date>2018-02-24T11:14:11.000000Z</date>
<paths><path text-mods="true" kind="file" action="M"
    prop-mods="false">stats.py</path></paths>
<msg/>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, None, "<msg/> must map to None, not empty string");
    }

    #[test]
    fn test_get_log_entries_missing_author() {
        let svn = SvnLogCollector::new("svn").with_relative_url("/project/trunk");
        let raw = r#"<log>
<logentry revision="1018">
<date>2018-02-24T11:14:11.000000Z</date>
<paths><path text-mods="true" kind="file" action="M"
    prop-mods="false">stats.py</path></paths>
<msg>i am invisible!</msg>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].author, None, "missing author is None, not empty");
        assert_eq!(entries[0].message.as_deref(), Some("i am invisible!"));
    }

    #[test]
    fn test_get_log_entries_missing_date_skips_entry() {
        let svn = SvnLogCollector::new("svn");
        let raw = r#"<log>
<logentry revision="1">
<author>elmotec</author>
<paths><path kind="file" action="M">a.py</path></paths>
<msg>no date here</msg>
</logentry>
<logentry revision="2">
<author>elmotec</author>
<date>2018-02-24T11:14:11.000000Z</date>
<paths><path kind="file" action="M">b.py</path></paths>
<msg>fine</msg>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert_eq!(entries.len(), 1, "entry without a date must be skipped, not fabricated");
        assert_eq!(entries[0].revision, "2", "later entries still come through");
    }

    #[test]
    fn test_get_log_entries_invalid_boolean_skips_entry() {
        let svn = SvnLogCollector::new("svn");
        let raw = r#"<log>
<logentry revision="7">
<date>2018-02-24T11:14:11.000000Z</date>
<paths><path text-mods="maybe" kind="file" action="M">a.py</path></paths>
<msg>bad flag</msg>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert!(entries.is_empty(), "unrecognized boolean must fail the entry");
    }

    #[test]
    fn test_get_log_entries_missing_path_text_gets_placeholder() {
        let svn = SvnLogCollector::new("svn");
        let raw = r#"<log>
<logentry revision="42">
<date>2018-02-24T11:14:11.000000Z</date>
<paths>
<path kind="file" action="M"></path>
<path kind="file" action="M">b.py</path>
</paths>
<msg>one path is broken</msg>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert_eq!(entries.len(), 2, "a broken path must not drop the rest of the entry");
        assert!(
            entries[0].path.contains("rev 42"),
            "placeholder should carry the revision for diagnosis: {}",
            entries[0].path
        );
        assert_eq!(entries[1].path, "b.py");
    }

    #[test]
    fn test_get_log_entries_copyfrom_fields() {
        let svn = SvnLogCollector::new("svn");
        let raw = r#"<log>
<logentry revision="1018">
<date>2018-02-24T11:14:11.000000Z</date>
<paths>
<path text-mods="false" kind="file" action="D"
    prop-mods="false">stats.py</path>
<path text-mods="false" kind="file" copyfrom-path="stats.py"
    copyfrom-rev="930" action="A" prop-mods="false">new_stats.py</path>
</paths>
<msg>renamed</msg>
</logentry>
</log>"#;
        let entries = collect(&svn, raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].copyfrom_rev, None, "absent copy-from maps to None");
        assert_eq!(entries[1].copyfrom_rev.as_deref(), Some("930"));
        assert_eq!(entries[1].copyfrom_path.as_deref(), Some("stats.py"));
        assert_eq!(entries[1].action.as_deref(), Some("A"));
    }

    #[test]
    fn test_multiline_message_collapsed_to_one_line() {
        let svn = SvnLogCollector::new("svn");
        let raw = "<log>
<logentry revision=\"5\">
<date>2018-02-24T11:14:11.000000Z</date>
<paths><path kind=\"file\" action=\"M\">a.py</path></paths>
<msg>first line
second line</msg>
</logentry>
</log>";
        let entries = collect(&svn, raw);
        assert_eq!(
            entries[0].message.as_deref(),
            Some("first line second line"),
            "embedded newlines collapse to single spaces"
        );
    }

    #[test]
    fn test_log_command_with_default_before() {
        let svn = SvnLogCollector::new("svn");
        let after = Utc.with_ymd_and_hms(2018, 2, 24, 0, 0, 0).unwrap();
        let argv = svn.log_command(after, None);
        assert_eq!(
            argv.join(" "),
            "svn log --xml -v -r {2018-02-24}:HEAD ."
        );
    }

    #[test]
    fn test_log_command_with_before() {
        let svn = SvnLogCollector::new("svn-1.7");
        let after = Utc.with_ymd_and_hms(2018, 2, 24, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let argv = svn.log_command(after, Some(before));
        assert_eq!(
            argv.join(" "),
            "svn-1.7 log --xml -v -r {2018-02-24}:{2018-06-01} .",
            "client name override must be honored"
        );
    }

    #[test]
    fn test_update_urls_discovers_relative_url() {
        let info = "Path: .
Working Copy Root Path: /home/elmotec/project
URL: https://subversion/svn/python/project/trunk
Relative URL: ^/project/trunk
Repository Root: https://subversion/svn/python
Revision: 12345
";
        let runner = StubRunner::ok(info);
        let mut svn = SvnLogCollector::new("svn");
        let url = svn.update_urls(&runner).expect("relative url present");
        assert_eq!(url, "/project/trunk");
    }

    #[test]
    fn test_update_urls_missing_line_is_an_error() {
        let runner = StubRunner::ok("Path: .\nRevision: 12345\n");
        let mut svn = SvnLogCollector::new("svn");
        let err = svn.update_urls(&runner).expect_err("no Relative URL line");
        assert!(err.contains("Relative URL"), "error should say what was missing: {err}");
    }

    #[test]
    fn test_download_file_builds_cat_command() {
        let runner = StubRunner::ok("print('ahah!')\n");
        let result = download_file(&runner, "1", "file.py", "svn").expect("download works");
        assert_eq!(result.revision, "1");
        assert_eq!(result.path.as_deref(), Some("file.py"));
        assert_eq!(result.content, "print('ahah!')\n");
    }

    #[test]
    fn test_get_diff_stats_process_failure_returns_empty() {
        let runner = StubRunner::fail("some error");
        let chunks = get_diff_stats(&runner, "1014", "svn");
        assert!(chunks.is_empty(), "a failed diff command yields zero chunks, not a panic");
    }
}
