use std::collections::BTreeSet;

use crate::types::{Clustering, ComponentRow};

// Cluster-center weight below which a token does not make it into the
// component name.
const NAME_WEIGHT_THRESHOLD: f64 = 0.4;

/// Groups rows of token counts into clusters. The backend is a black
/// box; anything k-means-shaped fits.
pub type ClusterFunc<'a> =
    &'a dyn Fn(&[String], &[Vec<f64>], usize) -> Result<Clustering, String>;

/// Guesses a component name for each path by clustering directory
/// token-count vectors.
///
/// Directory names are tokenized on `/` (backslashes normalized
/// first), stop words removed, and each path becomes one row of token
/// counts. The component name of a cluster joins the tokens whose
/// center weight exceeds the threshold, heaviest first, with `.`; a
/// cluster with no token above the threshold gets an empty name.
pub fn guess_components(
    paths: &[String],
    stop_words: &[String],
    n_clusters: usize,
    cluster_fn: ClusterFunc<'_>,
) -> Result<Vec<ComponentRow>, String> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let dirnames: Vec<Vec<String>> = paths.iter().map(|p| dirname_tokens(p, stop_words)).collect();
    let features: Vec<String> = dirnames
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows: Vec<Vec<f64>> = dirnames
        .iter()
        .map(|tokens| {
            features
                .iter()
                .map(|f| tokens.iter().filter(|t| *t == f).count() as f64)
                .collect()
        })
        .collect();

    let clustering = cluster_fn(&features, &rows, n_clusters)?;
    if clustering.labels.len() != paths.len() {
        return Err(format!(
            "clustering returned {} labels for {} paths",
            clustering.labels.len(),
            paths.len()
        ));
    }
    let names: Vec<String> = clustering
        .cluster_centers
        .iter()
        .map(|center| component_name(&clustering.feature_names, center))
        .collect();

    let mut result: Vec<ComponentRow> = paths
        .iter()
        .zip(&clustering.labels)
        .map(|(path, &label)| ComponentRow {
            path: path.clone(),
            component: names.get(label).cloned().unwrap_or_default(),
        })
        .collect();
    result.sort_by(|a, b| a.component.cmp(&b.component).then_with(|| a.path.cmp(&b.path)));
    Ok(result)
}

fn dirname_tokens(path: &str, stop_words: &[String]) -> Vec<String> {
    let normalized = path.replace('\\', "/");
    let dirname = match normalized.rfind('/') {
        Some(pos) => &normalized[..pos],
        None => "",
    };
    dirname
        .split('/')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !stop_words.contains(t))
        .collect()
}

fn component_name(features: &[String], center: &[f64]) -> String {
    let mut weighted: Vec<(f64, &str)> = features
        .iter()
        .zip(center)
        .filter(|(_, &w)| w > NAME_WEIGHT_THRESHOLD)
        .map(|(token, &w)| (w, token.as_str()))
        .collect();
    weighted.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.1.cmp(a.1))
    });
    weighted
        .iter()
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(".")
}
