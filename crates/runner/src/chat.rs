use anyhow::Result;

use crate::llm::{CallOptions, GenerativeService};
use crate::schema::Content;

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Earlier turns to seed the conversation with.
    pub history: Vec<Content>,
    pub system_instruction: Option<String>,
}

/// Conversation state for chat-bound runs. Every request carries the full
/// history; a turn is only recorded once the model has answered.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<Content>,
    system_instruction: Option<String>,
}

impl ChatSession {
    pub fn new(options: ChatOptions) -> Self {
        Self {
            history: options.history,
            system_instruction: options.system_instruction,
        }
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub async fn send_message<S>(
        &mut self,
        service: &S,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<String>
    where
        S: GenerativeService + ?Sized,
    {
        let mut contents = self.history.clone();
        contents.push(Content::user(prompt));

        let mut options = options.clone();
        if options.system_instruction.is_none() {
            options.system_instruction = self.system_instruction.clone();
        }

        let reply = service.generate_content(&contents, &options).await?;

        self.history.push(Content::user(prompt));
        self.history.push(Content::model(reply.clone()));

        Ok(reply)
    }
}
