use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Labeled prompts in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptSet {
    entries: Vec<(String, String)>,
}

impl PromptSet {
    /// Accepts either a list of prompts (labeled `prompt_1`, `prompt_2`, ...)
    /// or an object of label -> prompt.
    pub fn from_value(value: Value) -> Result<Self> {
        let entries = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let label = format!("prompt_{}", i + 1);
                    let prompt = expect_text(&label, item)?;
                    Ok((label, prompt))
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Object(map) => map
                .into_iter()
                .map(|(label, item)| {
                    let prompt = expect_text(&label, item)?;
                    Ok((label, prompt))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => anyhow::bail!(
                "JSON must be a list of prompts or a dictionary of key-prompt pairs."
            ),
        };

        Ok(Self { entries })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read prompts: {:?}", path))?;
        let value: Value = serde_json::from_str(&raw)
            .context(format!("Failed to parse prompts: {:?}", path))?;
        Self::from_value(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expect_text(label: &str, value: Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text),
        other => anyhow::bail!("Prompt {} must be a string, got {}", label, other),
    }
}
