//! Minimal Google Cloud REST client (API-key authenticated).

use crate::error::{RedubError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JSON-over-HTTPS client for Google Cloud APIs.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }

    /// POST `body` to `url` and decode the JSON response.
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RedubError::Google(describe_error(status.as_u16(), &text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| RedubError::Google(format!("Unexpected response from {}: {}", url, e)))
    }
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            let code = if envelope.error.code == 0 { status } else { envelope.error.code };
            format!("HTTP {}: {}", code, envelope.error.message)
        }
        _ => format!("HTTP {}: {}", status, body.trim()),
    }
}
