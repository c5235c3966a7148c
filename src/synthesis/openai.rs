//! OpenAI text-to-speech synthesis.

use super::{non_empty, Synthesizer};
use crate::error::{RedubError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use tracing::{info, instrument};

/// Synthesizer backed by the OpenAI speech endpoint.
pub struct OpenAISpeechSynthesizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAISpeechSynthesizer {
    /// `voice` is an OpenAI voice name such as `alloy` or `onyx`.
    pub fn new(api_key: &str, model: &str, voice: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key)?,
            model: parse_model(model),
            voice: parse_voice(voice)?,
        })
    }
}

fn parse_model(model: &str) -> SpeechModel {
    match model {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_voice(voice: &str) -> Result<Voice> {
    serde_json::from_value(serde_json::Value::String(voice.to_lowercase())).map_err(|_| {
        RedubError::Config(format!(
            "'{}' is not an OpenAI voice; set synthesis.voice to e.g. \"alloy\"",
            voice
        ))
    })
}

#[async_trait]
impl Synthesizer for OpenAISpeechSynthesizer {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| RedubError::Synthesis(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| RedubError::OpenAI(format!("Speech API error: {}", e)))?;

        let audio = non_empty(response.bytes.to_vec())?;
        info!("Synthesized {} bytes of MP3", audio.len());
        Ok(audio)
    }
}
