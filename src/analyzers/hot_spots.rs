use std::collections::{BTreeMap, HashSet};

use crate::types::{HotSpot, LocRow, LogEntry};

/// Crosses line counts with change counts keyed by revision.
pub fn hot_spots(entries: &[LogEntry], loc: &[LocRow]) -> Vec<HotSpot> {
    hot_spots_by(entries, loc, |e| e.revision.clone())
}

/// Crosses line counts with change counts, where `change_key` decides
/// what counts as one change (revision, day, author-day...). The join
/// is an outer one: a path known only to the line counter shows up with
/// zero changes, a path known only to the log shows up with zero lines.
pub fn hot_spots_by<K, F>(entries: &[LogEntry], loc: &[LocRow], change_key: F) -> Vec<HotSpot>
where
    K: Eq + std::hash::Hash,
    F: Fn(&LogEntry) -> K,
{
    let mut seen: HashSet<(K, &str)> = HashSet::new();
    let mut changes: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        if seen.insert((change_key(entry), entry.path.as_str())) {
            *changes.entry(entry.path.as_str()).or_insert(0) += 1;
        }
    }

    let mut rows: BTreeMap<&str, HotSpot> = BTreeMap::new();
    for row in loc {
        rows.insert(
            row.path.as_str(),
            HotSpot {
                path: row.path.clone(),
                lines: row.code,
                changes: 0,
            },
        );
    }
    for (path, count) in changes {
        rows.entry(path)
            .and_modify(|h| h.changes = count)
            .or_insert_with(|| HotSpot {
                path: path.to_string(),
                lines: 0,
                changes: count,
            });
    }

    let mut result: Vec<HotSpot> = rows.into_values().collect();
    result.sort_by(|a, b| {
        b.changes
            .cmp(&a.changes)
            .then_with(|| b.lines.cmp(&a.lines))
            .then_with(|| a.path.cmp(&b.path))
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_entry(revision: &str, path: &str) -> LogEntry {
        LogEntry {
            revision: revision.to_string(),
            author: Some("elmotec".to_string()),
            date: Utc.with_ymd_and_hms(2018, 2, 24, 11, 14, 11).unwrap(),
            path: path.to_string(),
            message: None,
            textmods: true,
            kind: "f".to_string(),
            action: Some("M".to_string()),
            propmods: false,
            copyfrom_rev: None,
            copyfrom_path: None,
            added: None,
            removed: None,
        }
    }

    fn make_loc(path: &str, code: u64) -> LocRow {
        LocRow {
            language: "Python".to_string(),
            path: path.to_string(),
            blank: 0,
            comment: 0,
            code,
        }
    }

    #[test]
    fn test_changes_joined_with_lines() {
        let entries = vec![
            make_entry("r1", "stats.py"),
            make_entry("r2", "stats.py"),
            make_entry("r2", "requirements.txt"),
        ];
        let loc = vec![make_loc("stats.py", 300), make_loc("requirements.txt", 3)];
        let spots = hot_spots(&entries, &loc);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].path, "stats.py", "most changed file first");
        assert_eq!(spots[0].lines, 300);
        assert_eq!(spots[0].changes, 2);
        assert_eq!(spots[1].changes, 1);
    }

    #[test]
    fn test_outer_join_fills_zero() {
        let entries = vec![make_entry("r1", "deleted.py")];
        let loc = vec![make_loc("untouched.py", 50)];
        let spots = hot_spots(&entries, &loc);
        let deleted = spots.iter().find(|s| s.path == "deleted.py").unwrap();
        assert_eq!(deleted.lines, 0, "path absent from line counts keeps zero lines");
        let untouched = spots.iter().find(|s| s.path == "untouched.py").unwrap();
        assert_eq!(untouched.changes, 0, "path absent from the log keeps zero changes");
        assert_eq!(untouched.lines, 50);
    }

    #[test]
    fn test_same_revision_touching_path_twice_counts_once() {
        let entries = vec![
            make_entry("r1", "stats.py"),
            make_entry("r1", "stats.py"),
        ];
        let spots = hot_spots(&entries, &[]);
        assert_eq!(spots[0].changes, 1, "(revision, path) pairs are deduplicated");
    }

    #[test]
    fn test_custom_change_key_merges_revisions() {
        let mut entries = vec![
            make_entry("r1", "stats.py"),
            make_entry("r2", "stats.py"),
        ];
        entries[1].date = entries[0].date;
        // Keyed by day both revisions collapse into one change.
        let spots = hot_spots_by(&entries, &[], |e| e.date.date_naive());
        assert_eq!(spots[0].changes, 1, "same-day revisions merge under a day key");
    }
}
