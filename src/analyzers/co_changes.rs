use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{CoChange, LogEntry};

/// Co-change coupling keyed by revision: for every ordered pair of
/// paths, how often the secondary changed in the same revision as the
/// primary, relative to how often the primary changed at all.
pub fn co_changes(entries: &[LogEntry]) -> Vec<CoChange> {
    co_changes_by(entries, |e| e.revision.clone())
}

/// Co-change coupling with a caller-chosen grouping key. Keying by day
/// instead of revision catches related work split across several
/// commits.
///
/// Coupling is directional: `cochanges(a, b) / changes(a)`, so a small
/// file dragged along by a big one scores high while the reverse stays
/// low. Self-pairs are excluded.
pub fn co_changes_by<K, F>(entries: &[LogEntry], join_key: F) -> Vec<CoChange>
where
    K: Ord + Clone,
    F: Fn(&LogEntry) -> K,
{
    let mut paths_per_key: BTreeMap<K, BTreeSet<&str>> = BTreeMap::new();
    for entry in entries {
        paths_per_key
            .entry(join_key(entry))
            .or_default()
            .insert(entry.path.as_str());
    }

    let mut changes: HashMap<&str, usize> = HashMap::new();
    let mut cochanges: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for paths in paths_per_key.values() {
        for &primary in paths {
            *changes.entry(primary).or_insert(0) += 1;
            for &secondary in paths {
                if primary == secondary {
                    continue;
                }
                *cochanges.entry((primary, secondary)).or_insert(0) += 1;
            }
        }
    }

    let mut result: Vec<CoChange> = cochanges
        .into_iter()
        .map(|((primary, secondary), count)| {
            let total = changes[primary];
            CoChange {
                primary: primary.to_string(),
                secondary: secondary.to_string(),
                changes: total,
                cochanges: count,
                coupling: count as f64 / total as f64,
            }
        })
        .collect();
    result.sort_by(|a, b| {
        b.coupling
            .partial_cmp(&a.coupling)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.primary.cmp(&b.primary))
            .then_with(|| a.secondary.cmp(&b.secondary))
    });
    result
}
