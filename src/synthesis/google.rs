//! Google Cloud Text-to-Speech synthesis.

use super::{non_empty, Synthesizer};
use crate::error::{RedubError, Result};
use crate::google::GoogleClient;
use crate::openai::create_http_client;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Synthesizer backed by the Text-to-Speech REST API.
pub struct GoogleSpeechSynthesizer {
    client: GoogleClient,
    voice: String,
    language: String,
}

impl GoogleSpeechSynthesizer {
    pub fn new(api_key: &str, voice: &str, language: &str) -> Result<Self> {
        Ok(Self {
            client: GoogleClient::new(create_http_client()?, api_key),
            voice: voice.to_string(),
            language: language.to_string(),
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> SynthesizeRequest<'a> {
        SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        }
    }
}

fn decode_audio(response: SynthesizeResponse) -> Result<Vec<u8>> {
    let audio = BASE64_STANDARD
        .decode(response.audio_content.trim())
        .map_err(|e| RedubError::Synthesis(format!("audio content is not base64: {}", e)))?;
    non_empty(audio)
}

#[async_trait]
impl Synthesizer for GoogleSpeechSynthesizer {
    #[instrument(skip(self, text), fields(voice = %self.voice, chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response: SynthesizeResponse = self
            .client
            .post_json(SYNTHESIZE_URL, &self.request(text))
            .await
            .map_err(|e| RedubError::Synthesis(e.to_string()))?;

        let audio = decode_audio(response)?;
        info!("Synthesized {} bytes of MP3", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let synth = GoogleSpeechSynthesizer::new("key", "en-US-Journey-D", "en-US").unwrap();
        let json = serde_json::to_value(synth.request("Hello world.")).unwrap();

        assert_eq!(json["input"]["text"], "Hello world.");
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert_eq!(json["voice"]["name"], "en-US-Journey-D");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn test_audio_content_is_decoded() {
        let response: SynthesizeResponse =
            serde_json::from_str(r#"{"audioContent":"SUQz"}"#).unwrap();
        assert_eq!(decode_audio(response).unwrap(), b"ID3");
    }

    #[test]
    fn test_empty_audio_is_a_synthesis_error() {
        let response: SynthesizeResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(decode_audio(response), Err(RedubError::Synthesis(_))));
    }
}
