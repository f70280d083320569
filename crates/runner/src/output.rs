use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::schema::ResponseRecord;

/// What happens to finished responses when a later prompt fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavePolicy {
    /// Write once after every prompt succeeded; a failure writes nothing.
    #[default]
    Atomic,
    /// Rewrite the output after each prompt; a failure keeps earlier responses.
    Incremental,
}

/// Responses keyed by prompt label, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Responses {
    entries: Map<String, Value>,
}

impl Responses {
    /// Insert or replace the record for `label`.
    pub fn insert(&mut self, label: impl Into<String>, record: ResponseRecord) {
        self.entries.insert(
            label.into(),
            json!({"prompt": record.prompt, "response": record.response}),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Receives batch progress so the runner itself never prints.
pub trait RunObserver {
    fn prompt_started(&mut self, label: &str);

    fn responses_saved(&mut self, path: &Path, count: usize);
}

/// Default observer: reports through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn prompt_started(&mut self, label: &str) {
        info!(label, "Running prompt: {}", label);
    }

    fn responses_saved(&mut self, path: &Path, count: usize) {
        info!(count, "Saved responses to {}", path.display());
    }
}

/// Write `responses` as 2-space indented JSON. The file is staged next to
/// `path` and renamed over it, so readers never see a half-written file.
pub async fn write_responses(path: &Path, responses: &Responses) -> Result<()> {
    let rendered = serde_json::to_string_pretty(responses)?;

    let staging = staging_path(path);
    tokio::fs::write(&staging, rendered)
        .await
        .context(format!("Failed to write responses: {:?}", staging))?;
    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e).context(format!("Failed to move responses into place: {:?}", path));
    }

    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    PathBuf::from(staged)
}
