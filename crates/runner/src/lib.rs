pub mod chat;
pub mod config;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod schema;

pub use chat::{ChatOptions, ChatSession};
pub use config::RunnerConfig;
pub use llm::{CallOptions, GenerativeService, VertexClient};
pub use output::{Responses, RunObserver, SavePolicy, TracingObserver};
pub use prompt::PromptSet;
pub use schema::{Content, GenerationConfig, ResponseRecord};

use anyhow::{Context, Result};
use output::write_responses;
use std::path::Path;
use tracing::info;

/// Drives a generative service over a batch of labeled prompts.
///
/// Starts stateless; after `start_chat` every call goes through the chat
/// session instead.
pub struct PromptRunner<S> {
    service: S,
    chat: Option<ChatSession>,
    default_options: CallOptions,
}

impl PromptRunner<VertexClient> {
    /// Bind to a Vertex AI project/region/model. Credentials come from
    /// `GOOGLE_ACCESS_TOKEN`.
    pub fn initialize(project_id: &str, location: &str, model_name: &str) -> Result<Self> {
        let client = VertexClient::new(project_id, location, model_name)
            .context("Failed to initialize Gemini client")?;
        info!("Initialized Gemini model: {}", model_name);
        Ok(Self::new(client))
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        let mut client = VertexClient::new(&config.project_id, &config.location, &config.model_name)
            .context("Failed to initialize Gemini client")?;
        if let Some(endpoint) = &config.endpoint {
            client = client.with_endpoint(endpoint.as_str());
        }
        info!("Initialized Gemini model: {}", client.model_name());

        let generation = (config.generation != GenerationConfig::default())
            .then(|| config.generation.clone());

        Ok(Self::new(client).with_default_options(CallOptions {
            generation_config: generation,
            system_instruction: None,
        }))
    }
}

impl<S: GenerativeService> PromptRunner<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            chat: None,
            default_options: CallOptions::default(),
        }
    }

    /// Options used for every prompt of a batch run.
    pub fn with_default_options(mut self, options: CallOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Open a chat session. Replaces any session already open.
    pub fn start_chat(&mut self, options: ChatOptions) {
        self.chat = Some(ChatSession::new(options));
        info!("Chat session started.");
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    pub fn is_chat_bound(&self) -> bool {
        self.chat.is_some()
    }

    /// Send one prompt, through the chat session when one is open.
    pub async fn call(&mut self, prompt: &str, options: &CallOptions) -> Result<String> {
        let result = match self.chat.as_mut() {
            Some(chat) => chat.send_message(&self.service, prompt, options).await,
            None => {
                self.service
                    .generate_content(&[Content::user(prompt)], options)
                    .await
            }
        };

        result.context("Gemini API call failed")
    }

    /// Run every prompt in `input` and save the labeled responses to `output`.
    ///
    /// Nothing is written unless every prompt succeeds.
    pub async fn process_prompts_from_json(
        &mut self,
        input: &Path,
        output: &Path,
        use_chat: bool,
    ) -> Result<Responses> {
        self.process_prompts_with(input, output, use_chat, SavePolicy::Atomic, &mut TracingObserver)
            .await
    }

    pub async fn process_prompts_with(
        &mut self,
        input: &Path,
        output: &Path,
        use_chat: bool,
        policy: SavePolicy,
        observer: &mut dyn RunObserver,
    ) -> Result<Responses> {
        self.run_batch(input, output, use_chat, policy, observer)
            .await
            .context("Error processing prompts from JSON")
    }

    async fn run_batch(
        &mut self,
        input: &Path,
        output: &Path,
        use_chat: bool,
        policy: SavePolicy,
        observer: &mut dyn RunObserver,
    ) -> Result<Responses> {
        let prompts = PromptSet::load(input).await?;

        if use_chat {
            self.start_chat(ChatOptions::default());
        }

        let options = self.default_options.clone();
        let mut responses = Responses::default();

        for (label, prompt) in prompts.iter() {
            observer.prompt_started(label);
            let response = self.call(prompt, &options).await?;
            responses.insert(
                label,
                ResponseRecord {
                    prompt: prompt.to_string(),
                    response,
                },
            );

            if policy == SavePolicy::Incremental {
                write_responses(output, &responses).await?;
            }
        }

        if policy == SavePolicy::Atomic || prompts.is_empty() {
            write_responses(output, &responses).await?;
        }
        observer.responses_saved(output, responses.len());

        Ok(responses)
    }
}
