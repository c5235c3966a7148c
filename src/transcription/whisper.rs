//! OpenAI Whisper transcription implementation.

use super::{join_results, Transcriber, Transcript};
use crate::error::{RedubError, Result};
use crate::media::MediaAsset;
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: String,
}

impl WhisperTranscriber {
    /// `language` may be a BCP-47 tag; Whisper only takes the ISO-639-1 part.
    pub fn new(api_key: &str, model: &str, language: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key)?,
            model: model.to_string(),
            language: iso_language(language),
        })
    }
}

/// `en-US` -> `en`.
fn iso_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .to_lowercase()
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self, audio), fields(audio = %audio.path.display()))]
    async fn transcribe(&self, audio: &MediaAsset) -> Result<Transcript> {
        debug!("Transcribing with {}", self.model);

        let file_bytes = tokio::fs::read(&audio.path).await?;
        let file_name = audio
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .language(&self.language)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| RedubError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| RedubError::OpenAI(format!("Whisper API error: {}", e)))?;

        join_results([response.text])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_language() {
        assert_eq!(iso_language("en-US"), "en");
        assert_eq!(iso_language("pt_BR"), "pt");
        assert_eq!(iso_language("de"), "de");
    }
}
