use std::collections::{BTreeMap, HashSet};

use crate::types::{LogEntry, MassChange};

/// Finds revisions touching more than `min_changes` distinct paths.
/// Large merges and tree-wide reformats drown out the organic change
/// signal, so most analyses start by filtering these out.
///
/// The comparison is strict: a revision with exactly `min_changes`
/// paths is not reported.
pub fn mass_change_sets(entries: &[LogEntry], min_changes: usize) -> Vec<MassChange> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut per_revision: BTreeMap<&str, MassChange> = BTreeMap::new();
    for entry in entries {
        if !seen.insert((entry.revision.as_str(), entry.path.as_str())) {
            continue;
        }
        per_revision
            .entry(entry.revision.as_str())
            .and_modify(|m| m.path_count += 1)
            .or_insert_with(|| MassChange {
                revision: entry.revision.clone(),
                path_count: 1,
                message: entry.message.clone(),
                author: entry.author.clone(),
            });
    }
    let mut result: Vec<MassChange> = per_revision
        .into_values()
        .filter(|m| m.path_count > min_changes)
        .collect();
    result.sort_by(|a, b| {
        b.path_count
            .cmp(&a.path_count)
            .then_with(|| a.revision.cmp(&b.revision))
    });
    result
}
