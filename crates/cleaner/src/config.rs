use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::patterns::{CleaningPatterns, DEFAULT_PATTERNS};

/// Config file looked up in the working directory by the binary.
pub const CONFIG_FILE: &str = "cleaner.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub folder: PathBuf,
    pub output_file: PathBuf,
    /// Substring a file name must contain to be merged.
    pub name_filter: String,
    pub extension: String,
    /// Regex sources, applied in order to every string leaf.
    pub patterns: Vec<String>,
}

/// Which directory entries get merged.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub extension: String,
    pub name_filter: String,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        let selection = SelectionConfig::default();
        Self {
            folder: PathBuf::from("./prompts+responses"),
            output_file: PathBuf::from("./prompts+responses/merged_response_output.txt"),
            name_filter: selection.name_filter,
            extension: selection.extension,
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            extension: ".json".to_string(),
            name_filter: "responses".to_string(),
        }
    }
}

impl SelectionConfig {
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.extension) && file_name.contains(&self.name_filter)
    }
}

impl CleanerConfig {
    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .context(format!("Failed to check config: {:?}", path))?;
        if !exists {
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&raw).context(format!("Failed to parse config: {:?}", path))
    }

    pub fn selection(&self) -> SelectionConfig {
        SelectionConfig {
            extension: self.extension.clone(),
            name_filter: self.name_filter.clone(),
        }
    }

    pub fn compile_patterns(&self) -> Result<CleaningPatterns> {
        CleaningPatterns::new(&self.patterns)
    }
}
