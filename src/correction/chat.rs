//! Chat-completion based corrector (OpenAI or Azure OpenAI).

use super::Corrector;
use crate::error::{RedubError, Result};
use crate::transcription::Transcript;
use async_openai::config::Config;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Corrector that sends the transcript as a single chat turn.
pub struct ChatCorrector<C: Config> {
    client: Client<C>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl<C: Config> ChatCorrector<C> {
    pub fn new(client: Client<C>, model: &str, system_prompt: &str, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            max_tokens,
        }
    }

    #[allow(deprecated)]
    fn build_request(&self, raw: &Transcript) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| RedubError::Correction(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(raw.text.clone())
                .build()
                .map_err(|e| RedubError::Correction(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| RedubError::Correction(e.to_string()))
    }
}

/// Text of the first choice; missing or blank content is an error.
fn first_choice_text(response: &CreateChatCompletionResponse) -> Result<String> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RedubError::Correction("Empty response from model".to_string()))
}

#[async_trait]
impl<C: Config + Send + Sync + 'static> Corrector for ChatCorrector<C> {
    #[instrument(skip(self, raw), fields(words = raw.word_count()))]
    async fn correct(&self, raw: &Transcript) -> Result<Transcript> {
        let request = self.build_request(raw)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| RedubError::OpenAI(format!("Correction request failed: {}", e)))?;

        let text = first_choice_text(&response)?;
        debug!("Corrected transcript: {}", text);
        Ok(Transcript::corrected(text))
    }
}
