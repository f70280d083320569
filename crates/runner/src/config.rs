use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::SavePolicy;
use crate::schema::GenerationConfig;

/// Config file looked up in the working directory by the binary.
pub const CONFIG_FILE: &str = "runner.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Must name an existing Google Cloud project, otherwise the
    /// credentials will not resolve.
    pub project_id: String,
    pub location: String,
    pub model_name: String,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub use_chat: bool,
    pub save_policy: SavePolicy,
    /// Overrides `https://{location}-aiplatform.googleapis.com`.
    pub endpoint: Option<String>,
    pub generation: GenerationConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: "us-central1".to_string(),
            model_name: "gemini-2.5-flash".to_string(),
            input_file: PathBuf::from("prompts.json"),
            output_file: PathBuf::from("responses.json"),
            use_chat: true,
            save_policy: SavePolicy::Atomic,
            endpoint: None,
            generation: GenerationConfig::default(),
        }
    }
}

impl RunnerConfig {
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

    /// Apply `GOOGLE_CLOUD_PROJECT`, `GOOGLE_CLOUD_LOCATION` and `GEMINI_MODEL`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(project_id) = non_empty("GOOGLE_CLOUD_PROJECT") {
            self.project_id = project_id;
        }
        if let Some(location) = non_empty("GOOGLE_CLOUD_LOCATION") {
            self.location = location;
        }
        if let Some(model_name) = non_empty("GEMINI_MODEL") {
            self.model_name = model_name;
        }
        self
    }
}
