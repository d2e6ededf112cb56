use chrono::{DateTime, Utc};
use serde::Serialize;

// ─── Normalized log ───────────────────────────────────────────────────────────

/// One row of the normalized SCM log: a single path touched by a single
/// revision. Both backends (svn, git) produce this exact shape.
///
/// `added`/`removed` stay `None` until a diff-stat pass fills them in;
/// they are never fabricated as zero. Optional string fields use `None`
/// for "the backend did not report this", which is distinct from an
/// empty string the backend really produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub revision: String,
    pub author: Option<String>,
    pub date: DateTime<Utc>,
    pub path: String,
    pub message: Option<String>,
    pub textmods: bool,
    pub kind: String,
    pub action: Option<String>,
    pub propmods: bool,
    pub copyfrom_rev: Option<String>,
    pub copyfrom_path: Option<String>,
    pub added: Option<u64>,
    pub removed: Option<u64>,
}

/// One hunk of a unified diff, attributed to a path.
/// `chunk` is 1-based and resets for each new path in the diff.
/// `first`/`last` span the hunk in the target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffChunk {
    pub path: String,
    pub chunk: usize,
    pub first: u64,
    pub last: u64,
    pub added: u64,
    pub removed: u64,
}

/// Per-path roll-up of [`DiffChunk`] rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathDiffStats {
    pub path: String,
    pub added: u64,
    pub removed: u64,
}

/// Content retrieved at a point in history. `path` is `None` when the
/// download targeted a whole revision (e.g. a full diff).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub revision: String,
    pub path: Option<String>,
    pub content: String,
}

/// One row of the size table (`cloc --csv --by-file` output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocRow {
    pub language: String,
    pub path: String,
    pub blank: u64,
    pub comment: u64,
    pub code: u64,
}

// ─── Analyzer outputs ─────────────────────────────────────────────────────────

/// A revision that touched more distinct paths than the caller's threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MassChange {
    pub revision: String,
    pub path_count: usize,
    pub message: Option<String>,
    pub author: Option<String>,
}

/// Age of the most recent modification of a group (by default, a path),
/// in fractional days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeRow {
    pub path: String,
    pub age_days: f64,
}

/// A path crossed with its size and how often it changed in range.
/// `lines` is 0 for paths with history but no code in the size table;
/// `changes` is 0 for paths with code but no history in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotSpot {
    pub path: String,
    pub lines: u64,
    pub changes: usize,
}

/// How often `secondary` changed in the same change unit as `primary`.
/// `coupling` = `cochanges` / `changes`, where `changes` counts every
/// appearance of `primary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoChange {
    pub primary: String,
    pub secondary: String,
    pub changes: usize,
    pub cochanges: usize,
    pub coupling: f64,
}

/// Every path labeled with the name of the directory cluster it fell into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRow {
    pub path: String,
    pub component: String,
}

// ─── Complexity collaborator contract ─────────────────────────────────────────

/// Per-function record produced by the external complexity analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionMetrics {
    pub name: String,
    pub long_name: String,
    pub nloc: u64,
    pub ccn: u64,
    pub token_count: u64,
    pub start_line: u64,
    pub end_line: u64,
}

/// What the external analyzer reports for one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAnalysis {
    pub functions: Vec<FunctionMetrics>,
    pub token_count: u64,
    pub nloc: u64,
}

/// One function of one (revision, path), flattened together with the
/// file-level aggregates so rows from different groups concatenate safely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityRow {
    pub revision: String,
    pub path: String,
    pub name: String,
    pub long_name: String,
    pub nloc: u64,
    pub ccn: u64,
    pub token_count: u64,
    pub start_line: u64,
    pub end_line: u64,
    pub file_tokens: u64,
    pub file_nloc: u64,
}

// ─── Clustering collaborator contract ─────────────────────────────────────────

/// Output of the external vectorize-and-cluster primitive: token weights
/// per cluster center plus one label per input string.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub feature_names: Vec<String>,
    pub cluster_centers: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_entry_serializes_including_date() {
        let entry = LogEntry {
            revision: "1018".to_string(),
            author: Some("elmotec".to_string()),
            date: Utc.with_ymd_and_hms(2018, 2, 24, 11, 14, 11).unwrap(),
            path: "stats.py".to_string(),
            message: None,
            textmods: true,
            kind: "file".to_string(),
            action: Some("M".to_string()),
            propmods: false,
            copyfrom_rev: None,
            copyfrom_path: None,
            added: None,
            removed: None,
        };
        let json = serde_json::to_string(&entry).expect("log rows must serialize");
        assert!(json.contains("\"revision\":\"1018\""), "unexpected JSON: {json}");
        assert!(
            json.contains("2018-02-24T11:14:11"),
            "the timestamp must serialize alongside the other fields: {json}"
        );
    }
}
