use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{DiffChunk, PathDiffStats};

// Hunk boundary: @@ -<start>,<count> +<start>,<count> @@ (counts optional).
static HUNK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap());

// File headers as produced by `svn diff --git` and plain `git diff`.
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Index: (.+)$").unwrap());
static GIT_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^diff --git a/.+ b/(.+)$").unwrap());

/// Parses unified-diff text into per-path, per-chunk added/removed
/// counts. Chunk ids are 1-based and reset on each new file header.
///
/// Empty or unparseable input yields zero chunks, never an error; the
/// caller decides whether an empty result matters.
pub fn parse_diff(text: &str) -> Vec<DiffChunk> {
    let mut chunks: Vec<DiffChunk> = Vec::new();
    let mut path: Option<String> = None;
    let mut saw_index_header = false;
    let mut chunk_in_path = 0usize;
    let mut current: Option<DiffChunk> = None;

    for line in text.lines() {
        if let Some(caps) = INDEX_RE.captures(line) {
            if let Some(c) = current.take() {
                chunks.push(c);
            }
            path = Some(caps[1].trim().to_string());
            saw_index_header = true;
            chunk_in_path = 0;
            continue;
        }
        if let Some(caps) = GIT_HEADER_RE.captures(line) {
            if let Some(c) = current.take() {
                chunks.push(c);
            }
            // svn prepends its own Index: header which names the path
            // relative to the checkout; prefer it when present.
            if !saw_index_header {
                path = Some(caps[1].trim().to_string());
                chunk_in_path = 0;
            }
            continue;
        }
        if let Some(caps) = HUNK_RE.captures(line) {
            if let Some(c) = current.take() {
                chunks.push(c);
            }
            let Some(p) = &path else { continue };
            let first: u64 = caps[1].parse().unwrap_or(0);
            let count: u64 = caps
                .get(2)
                .map(|m| m.as_str().parse().unwrap_or(1))
                .unwrap_or(1);
            chunk_in_path += 1;
            current = Some(DiffChunk {
                path: p.clone(),
                chunk: chunk_in_path,
                first,
                last: first + count,
                added: 0,
                removed: 0,
            });
            continue;
        }
        if let Some(c) = current.as_mut() {
            if line.starts_with("+++") || line.starts_with("---") {
                continue;
            }
            if line.starts_with('+') {
                c.added += 1;
            } else if line.starts_with('-') {
                c.removed += 1;
            }
        }
    }
    if let Some(c) = current.take() {
        chunks.push(c);
    }
    chunks
}

/// Rolls chunk statistics up to one added/removed total per path.
pub fn sum_per_path(chunks: &[DiffChunk]) -> Vec<PathDiffStats> {
    let mut totals: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for c in chunks {
        let entry = totals.entry(c.path.as_str()).or_insert((0, 0));
        entry.0 += c.added;
        entry.1 += c.removed;
    }
    totals
        .into_iter()
        .map(|(path, (added, removed))| PathDiffStats {
            path: path.to_string(),
            added,
            removed,
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DIFFS: &str = r#"Index: estimate/__init__.py
===================================================================
diff --git a/estimate/estimate/__init__.py b/estimate/estimate/__init__.py
--- a/estimate/estimate/__init__.py     (revision 1013)
+++ b/estimate/estimate/__init__.py     (revision 1014)
@@ -8,7 +8,7 @@
 import logging
 import warnings

-__version__ = "0.44.2"
+__version__ = "0.44.3"
 package_name = 'estimate'
Index: estimate/mktdata.py
===================================================================
diff --git a/estimate/estimate/mktdata.py b/estimate/estimate/mktdata.py
--- a/estimate/estimate/mktdata.py      (revision 1013)
+++ b/estimate/estimate/mktdata.py      (revision 1014)
@@ -1042,7 +1042,7 @@
     def get_prices(self, securities=None,
-                   source=None, keep_source=False) -> pd.DataFrame:
+                   source=None) -> pd.DataFrame:
         pass
@@ -1086,7 +1086,10 @@
         def adjust_prices(df, _pdb=None):
-            df.sort_values('as_of_date', ascending=False, inplace=True)
+            df.sort_values(['as_of_date', 'source'], ascending=False,
+                           inplace=True)
+            df.drop_duplicates(['as_of_date'], keep='last',
+                               inplace=True)
             pass
Index: setup.py
===================================================================
diff --git a/estimate/setup.py b/estimate/setup.py
--- a/estimate/setup.py (revision 1013)
+++ b/estimate/setup.py (revision 1014)
@@ -22,7 +22,7 @@
 setup(
     name="estimate",
-    version="0.44.2",
+    version="0.44.3",
     author="elmotec",
"#;

    #[test]
    fn test_empty_input_yields_zero_chunks() {
        assert!(parse_diff("").is_empty(), "empty diff is not an error");
        assert!(parse_diff("random text\nno diff here\n").is_empty());
    }

    #[test]
    fn test_chunks_per_path() {
        let chunks = parse_diff(DIFFS);
        let mktdata: Vec<&DiffChunk> =
            chunks.iter().filter(|c| c.path == "estimate/mktdata.py").collect();
        assert_eq!(mktdata.len(), 2, "two hunks in mktdata.py");
        assert_eq!(mktdata[0].chunk, 1, "chunk ids are 1-based");
        assert_eq!(mktdata[1].chunk, 2);
        let setup: Vec<&DiffChunk> = chunks.iter().filter(|c| c.path == "setup.py").collect();
        assert_eq!(setup.len(), 1);
        assert_eq!(setup[0].chunk, 1, "chunk counter resets per path");
    }

    #[test]
    fn test_added_removed_counts() {
        let chunks = parse_diff(DIFFS);
        let first = chunks.iter().find(|c| c.path == "estimate/__init__.py").unwrap();
        assert_eq!(first.added, 1);
        assert_eq!(first.removed, 1);
        let second = chunks.iter().find(|c| c.path == "estimate/mktdata.py" && c.chunk == 2).unwrap();
        assert_eq!(second.added, 4);
        assert_eq!(second.removed, 1);
    }

    #[test]
    fn test_hunk_line_spans() {
        let chunks = parse_diff(DIFFS);
        let first = chunks.iter().find(|c| c.path == "estimate/__init__.py").unwrap();
        assert_eq!(first.first, 8);
        assert_eq!(first.last, 15, "last = target start + target count");
        let late = chunks.iter().find(|c| c.path == "estimate/mktdata.py" && c.chunk == 2).unwrap();
        assert_eq!(late.first, 1086);
        assert_eq!(late.last, 1096);
    }

    #[test]
    fn test_git_only_headers_without_index_lines() {
        let diff = "diff --git a/src/lib.rs b/src/lib.rs\n\
                    --- a/src/lib.rs\n\
                    +++ b/src/lib.rs\n\
                    @@ -1,3 +1,4 @@\n\
                    +use std::fmt;\n\
                     fn main() {}\n";
        let chunks = parse_diff(diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].path, "src/lib.rs", "falls back to the git header path");
        assert_eq!(chunks[0].added, 1);
        assert_eq!(chunks[0].removed, 0);
    }

    #[test]
    fn test_sum_per_path() {
        let chunks = parse_diff(DIFFS);
        let totals = sum_per_path(&chunks);
        let mktdata = totals.iter().find(|t| t.path == "estimate/mktdata.py").unwrap();
        assert_eq!(mktdata.added, 5, "chunk totals roll up per path");
        assert_eq!(mktdata.removed, 2);
        assert_eq!(totals.len(), 3, "one row per path");
    }

    #[test]
    fn test_plus_plus_plus_header_not_counted_as_addition() {
        let diff = "Index: a.py\n@@ -1,1 +1,1 @@\n--- a/a.py\n+++ b/a.py\n+real addition\n";
        let chunks = parse_diff(diff);
        assert_eq!(chunks[0].added, 1, "'+++' and '---' are headers, not content");
        assert_eq!(chunks[0].removed, 0);
    }
}
