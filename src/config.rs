use serde::Deserialize;
use std::path::Path;

/// All settings that can be placed in a .scmlens.yml config file.
/// Every field is optional — omitted fields fall back to CLI defaults.
/// CLI flags always take precedence over values set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LensConfig {
    // Collection defaults (overridden by the corresponding CLI flag)
    pub vcs: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub path: Option<String>,

    // Report defaults
    pub format: Option<String>,
    pub top: Option<usize>,
    pub min_changes: Option<usize>,
    pub output: Option<String>,

    // External program overrides
    pub svn_client: Option<String>,
    pub git_client: Option<String>,
    pub cloc_program: Option<String>,
}

impl LensConfig {
    /// Validates semantic constraints that serde cannot enforce.
    ///
    /// Returns a human-readable error naming the offending field and the
    /// accepted values. Called automatically by [`load_config`].
    pub fn validate(&self) -> Result<(), String> {
        if let Some(vcs) = &self.vcs {
            match vcs.as_str() {
                "git" | "svn" => {}
                other => {
                    return Err(format!(
                        "Invalid 'vcs' value: \"{other}\". Expected \"git\" or \"svn\""
                    ))
                }
            }
        }
        if let Some(fmt) = &self.format {
            match fmt.as_str() {
                "terminal" | "json" => {}
                other => {
                    return Err(format!(
                        "Invalid 'format' value: \"{other}\". \
                         Expected \"terminal\" or \"json\""
                    ))
                }
            }
        }
        // top: 0 would silently produce an empty report — almost certainly a mistake
        if let Some(0) = self.top {
            return Err("Invalid 'top' value: 0. Must be 1 or greater".to_string());
        }
        Ok(())
    }
}

/// Reads, parses, and validates a YAML config file from `path`.
pub fn load_config(path: &Path) -> Result<LensConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config file '{}': {e}", path.display()))?;
    let cfg: LensConfig = serde_yaml::from_str(&content)
        .map_err(|e| format!("Invalid config file '{}': {e}", path.display()))?;
    cfg.validate()
        .map_err(|e| format!("Config file '{}': {e}", path.display()))?;
    Ok(cfg)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
