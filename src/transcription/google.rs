//! Google Cloud Speech-to-Text transcription.

use super::{join_results, Transcriber, Transcript};
use crate::error::{RedubError, Result};
use crate::google::GoogleClient;
use crate::media::MediaAsset;
use crate::openai::create_http_client;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Transcriber backed by the Speech-to-Text REST API.
pub struct GoogleSpeechTranscriber {
    client: GoogleClient,
    language: String,
    sample_rate: u32,
}

impl GoogleSpeechTranscriber {
    pub fn new(api_key: &str, language: &str, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            client: GoogleClient::new(create_http_client()?, api_key),
            language: language.to_string(),
            sample_rate,
        })
    }
}

#[async_trait]
impl Transcriber for GoogleSpeechTranscriber {
    #[instrument(skip(self, audio), fields(audio = %audio.path.display()))]
    async fn transcribe(&self, audio: &MediaAsset) -> Result<Transcript> {
        let bytes = tokio::fs::read(&audio.path).await?;
        debug!("Sending {} bytes of LINEAR16 audio", bytes.len());

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: audio.sample_rate.unwrap_or(self.sample_rate),
                language_code: &self.language,
            },
            audio: RecognitionAudio {
                content: BASE64_STANDARD.encode(&bytes),
            },
        };

        let response: RecognizeResponse = self
            .client
            .post_json(RECOGNIZE_URL, &request)
            .await
            .map_err(|e| RedubError::Transcription(e.to_string()))?;

        let transcript = transcript_from(response)?;
        info!("Recognized {} words", transcript.word_count());
        Ok(transcript)
    }
}

/// First alternative of every result, joined.
fn transcript_from(response: RecognizeResponse) -> Result<Transcript> {
    join_results(
        response
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
            .map(|a| a.transcript),
    )
}
