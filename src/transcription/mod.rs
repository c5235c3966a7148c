//! Speech-to-text for the normalized audio track.
//!
//! # Providers
//!
//! - **Google** (default): Cloud Speech-to-Text `speech:recognize` with the
//!   mono 16-bit PCM sent inline as LINEAR16.
//! - **Whisper**: OpenAI audio transcription.

mod google;
mod models;
mod whisper;

pub use google::GoogleSpeechTranscriber;
pub use models::{join_results, Provenance, Transcript};
pub use whisper::WhisperTranscriber;

use crate::config::{Credentials, TranscriptionProvider, TranscriptionSettings};
use crate::error::Result;
use crate::media::MediaAsset;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a mono PCM WAV asset into a raw transcript.
    ///
    /// An empty recognition result is a transcription error.
    async fn transcribe(&self, audio: &MediaAsset) -> Result<Transcript>;
}

/// Build the transcriber for the configured provider.
pub fn create_transcriber(
    settings: &TranscriptionSettings,
    sample_rate: u32,
    credentials: &Credentials,
) -> Result<Arc<dyn Transcriber>> {
    Ok(match settings.provider {
        TranscriptionProvider::Google => Arc::new(GoogleSpeechTranscriber::new(
            credentials.require_google()?,
            &settings.language,
            sample_rate,
        )?),
        TranscriptionProvider::Whisper => Arc::new(WhisperTranscriber::new(
            credentials.require_openai()?,
            &settings.model,
            &settings.language,
        )?),
    })
}
