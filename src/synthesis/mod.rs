//! Text-to-speech for the corrected transcript.

mod google;
mod openai;

pub use google::GoogleSpeechSynthesizer;
pub use openai::OpenAISpeechSynthesizer;

use crate::config::{Credentials, SynthesisProvider, SynthesisSettings};
use crate::error::{RedubError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for speech synthesis services.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` and return MP3 bytes. Empty audio is a synthesis error.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Build the synthesizer for the configured provider.
pub fn create_synthesizer(
    settings: &SynthesisSettings,
    credentials: &Credentials,
) -> Result<Arc<dyn Synthesizer>> {
    Ok(match settings.provider {
        SynthesisProvider::Google => Arc::new(GoogleSpeechSynthesizer::new(
            credentials.require_google()?,
            &settings.voice,
            &settings.language,
        )?),
        SynthesisProvider::OpenAI => Arc::new(OpenAISpeechSynthesizer::new(
            credentials.require_openai()?,
            &settings.model,
            &settings.voice,
        )?),
    })
}

fn non_empty(audio: Vec<u8>) -> Result<Vec<u8>> {
    if audio.is_empty() {
        return Err(RedubError::Synthesis("service returned no audio".to_string()));
    }
    Ok(audio)
}
