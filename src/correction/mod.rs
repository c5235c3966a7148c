//! Grammar correction of raw transcripts.

mod chat;

pub use chat::ChatCorrector;

use crate::config::{CorrectionProvider, CorrectionSettings, Credentials};
use crate::error::Result;
use crate::openai::{create_azure_client, create_client, AzureEndpoint};
use crate::transcription::Transcript;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Trait for transcript correction services.
#[async_trait]
pub trait Corrector: Send + Sync {
    /// Rewrite a raw transcript. Returns a transcript with corrected provenance.
    async fn correct(&self, raw: &Transcript) -> Result<Transcript>;
}

/// Build the corrector for the configured provider.
pub fn create_corrector(
    settings: &CorrectionSettings,
    system_prompt: &str,
    credentials: &Credentials,
) -> Result<Arc<dyn Corrector>> {
    match settings.provider {
        CorrectionProvider::OpenAI => {
            let client = create_client(credentials.require_openai()?)?;
            info!("Correcting with OpenAI model {}", settings.model);
            Ok(Arc::new(ChatCorrector::new(
                client,
                &settings.model,
                system_prompt,
                settings.max_tokens,
            )))
        }
        CorrectionProvider::Azure => {
            let (key, url) = credentials.require_azure()?;
            let endpoint = AzureEndpoint::parse(
                url,
                settings.azure_deployment.as_deref(),
                &settings.azure_api_version,
            )?;
            info!(
                "Correcting with Azure deployment {} ({})",
                endpoint.deployment, endpoint.api_version
            );
            let client = create_azure_client(key, &endpoint)?;
            Ok(Arc::new(ChatCorrector::new(
                client,
                &endpoint.deployment,
                system_prompt,
                settings.max_tokens,
            )))
        }
    }
}
