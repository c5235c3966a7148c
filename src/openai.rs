//! HTTP and OpenAI client configuration with sensible defaults.

use crate::error::{RedubError, Result};
use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::Client;
use std::time::Duration;
use url::Url;

/// Default timeout for service requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create the HTTP client shared by all service calls.
pub fn create_http_client() -> Result<reqwest::Client> {
    create_http_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an HTTP client with a custom timeout.
pub fn create_http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RedubError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an OpenAI client for `api_key`.
pub fn create_client(api_key: &str) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new().with_api_key(api_key);
    Ok(Client::with_config(config).with_http_client(create_http_client()?))
}

/// Create an Azure OpenAI client for a parsed deployment endpoint.
pub fn create_azure_client(api_key: &str, endpoint: &AzureEndpoint) -> Result<Client<AzureConfig>> {
    let config = AzureConfig::new()
        .with_api_base(&endpoint.api_base)
        .with_deployment_id(&endpoint.deployment)
        .with_api_version(&endpoint.api_version)
        .with_api_key(api_key);
    Ok(Client::with_config(config).with_http_client(create_http_client()?))
}

/// An Azure OpenAI deployment, split out of a full request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoint {
    /// Scheme and host, e.g. `https://my-resource.openai.azure.com`.
    pub api_base: String,
    pub deployment: String,
    pub api_version: String,
}

impl AzureEndpoint {
    /// Parse a URL such as
    /// `https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview`.
    ///
    /// `deployment` and `default_version` fill in whatever the URL leaves out.
    pub fn parse(
        raw: &str,
        deployment: Option<&str>,
        default_version: &str,
    ) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| RedubError::Config(format!("Invalid AZURE_API_URL '{}': {}", raw, e)))?;

        let host = url
            .host_str()
            .ok_or_else(|| RedubError::Config(format!("AZURE_API_URL has no host: {}", raw)))?;
        let api_base = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let from_path = url.path_segments().and_then(|mut segments| {
            segments
                .by_ref()
                .find(|s| *s == "deployments")
                .and_then(|_| segments.next())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        });

        let deployment = deployment
            .map(|d| d.to_string())
            .or(from_path)
            .ok_or_else(|| {
                RedubError::Config(
                    "No Azure deployment: set correction.azure_deployment or use a \
                     /openai/deployments/<name>/... URL"
                        .to_string(),
                )
            })?;

        let api_version = url
            .query_pairs()
            .find(|(k, _)| k == "api-version")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| default_version.to_string());

        Ok(Self {
            api_base,
            deployment,
            api_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_deployment_url() {
        let endpoint = AzureEndpoint::parse(
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01",
            None,
            "2024-02-15-preview",
        )
        .unwrap();

        assert_eq!(endpoint.api_base, "https://res.openai.azure.com");
        assert_eq!(endpoint.deployment, "gpt-4o");
        assert_eq!(endpoint.api_version, "2024-06-01");
    }

    #[test]
    fn test_parse_bare_resource_url_uses_overrides() {
        let endpoint = AzureEndpoint::parse(
            "https://res.openai.azure.com:8443/",
            Some("grammar"),
            "2024-02-15-preview",
        )
        .unwrap();

        assert_eq!(endpoint.api_base, "https://res.openai.azure.com:8443");
        assert_eq!(endpoint.deployment, "grammar");
        assert_eq!(endpoint.api_version, "2024-02-15-preview");
    }

    #[test]
    fn test_parse_without_deployment_fails() {
        let err = AzureEndpoint::parse("https://res.openai.azure.com/", None, "v").unwrap_err();
        assert!(matches!(err, RedubError::Config(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(AzureEndpoint::parse("not a url", None, "v").is_err());
    }
}
