use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::schema::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

/// Environment variable holding an OAuth access token for Vertex AI,
/// e.g. the output of `gcloud auth print-access-token`.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

/// Per-call options forwarded to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    pub generation_config: Option<GenerationConfig>,
    pub system_instruction: Option<String>,
}

/// A hosted text-generation backend: one request in, one text reply out.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate_content(&self, contents: &[Content], options: &CallOptions) -> Result<String>;
}

/// Gemini on Vertex AI via the `generateContent` REST endpoint.
#[derive(Clone)]
pub struct VertexClient {
    endpoint: String,
    project_id: String,
    location: String,
    model_name: String,
    access_token: String,
    client: reqwest::Client,
}

impl VertexClient {
    /// Bind to a project/region/model using the token from `GOOGLE_ACCESS_TOKEN`.
    pub fn new(project_id: &str, location: &str, model_name: &str) -> Result<Self> {
        ensure_present("project id", project_id)?;
        let access_token = std::env::var(ACCESS_TOKEN_ENV)
            .context(format!("{} is not set; credentials are required", ACCESS_TOKEN_ENV))?;
        Self::with_access_token(project_id, location, model_name, &access_token)
    }

    pub fn with_access_token(
        project_id: &str,
        location: &str,
        model_name: &str,
        access_token: &str,
    ) -> Result<Self> {
        ensure_present("project id", project_id)?;
        ensure_present("location", location)?;
        ensure_present("model name", model_name)?;
        ensure_present("access token", access_token)?;

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: format!("https://{}-aiplatform.googleapis.com", location),
            project_id: project_id.to_string(),
            location: location.to_string(),
            model_name: model_name.to_string(),
            access_token: access_token.to_string(),
            client,
        })
    }

    /// Point at a different API host (regional override or a local mock).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.endpoint, self.project_id, self.location, self.model_name
        )
    }
}

#[async_trait]
impl GenerativeService for VertexClient {
    async fn generate_content(&self, contents: &[Content], options: &CallOptions) -> Result<String> {
        let request = GenerateContentRequest {
            contents,
            system_instruction: options.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part { text: Some(text.clone()) }],
            }),
            generation_config: options.generation_config.as_ref(),
        };

        let response = self.client
            .post(self.url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Vertex AI")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vertex AI request failed: {} {}", status, body.trim());
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Vertex AI response")?;

        response_text(parsed)
    }
}

/// Text of the first candidate, all parts joined.
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => anyhow::bail!("Prompt was blocked: {}", reason),
            None => anyhow::bail!("Response contained no candidates"),
        }
    };

    match candidate.content {
        Some(content) if content.parts.iter().any(|p| p.text.is_some()) => Ok(content.text()),
        _ => anyhow::bail!(
            "Response candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ),
    }
}

fn ensure_present(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Vertex AI {} must not be empty", what);
    }
    Ok(())
}
