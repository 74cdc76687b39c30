use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Engine settings. Every field has a default, so a config file only needs
/// the keys it changes:
///
/// ```json
/// {"fence_languages": ["dataview", "dql"], "inline_prefix": null}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fenced code block languages that hold queries (case-insensitive)
    pub fence_languages: Vec<String>,

    /// Prefix of single-line inline queries such as `` `dv: LIST FROM #x` ``;
    /// `None` turns inline detection off
    pub inline_prefix: Option<String>,

    /// Upper bound on notes considered per query; the rest are ignored
    pub max_notes: Option<usize>,

    /// Append a link to the owning note after each rendered task
    pub task_links: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            fence_languages: vec!["dataview".to_string()],
            inline_prefix: Some("dv:".to_string()),
            max_notes: None,
            task_links: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
