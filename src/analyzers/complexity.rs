use crate::types::{ComplexityRow, DownloadResult, SourceAnalysis};

/// Retrieves file content for one (revision, path) pair.
pub type DownloadFunc<'a> = &'a dyn Fn(&str, &str) -> Result<DownloadResult, String>;

/// Computes function-level metrics from source text. The analysis
/// backend is a black box here; any tool able to report per-function
/// cyclomatic complexity fits.
pub type AnalyzeFunc<'a> = &'a dyn Fn(&str) -> Result<SourceAnalysis, String>;

/// Function-level complexity for a set of (revision, path) pairs:
/// downloads each file as it was at that revision, analyzes it, and
/// emits one row per function found, annotated with the file totals.
///
/// A file with no recognizable functions contributes no rows. An empty
/// group is not an error, just an empty result.
pub fn get_complexity(
    group: &[(String, String)],
    download: DownloadFunc<'_>,
    analyze: AnalyzeFunc<'_>,
) -> Result<Vec<ComplexityRow>, String> {
    if group.is_empty() {
        log::info!("get_complexity called on an empty group");
        return Ok(Vec::new());
    }
    let mut rows = Vec::new();
    for (revision, path) in group {
        let downloaded = download(revision, path)?;
        let analysis = analyze(&downloaded.content)?;
        for function in &analysis.functions {
            rows.push(ComplexityRow {
                revision: revision.clone(),
                path: path.clone(),
                name: function.name.clone(),
                long_name: function.long_name.clone(),
                nloc: function.nloc,
                ccn: function.ccn,
                token_count: function.token_count,
                start_line: function.start_line,
                end_line: function.end_line,
                file_tokens: analysis.token_count,
                file_nloc: analysis.nloc,
            });
        }
    }
    Ok(rows)
}
