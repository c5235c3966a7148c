//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available
//! before starting a run that would otherwise fail midway.

use crate::config::{
    CorrectionProvider, Credentials, Settings, SynthesisProvider, TranscriptionProvider,
};
use crate::error::{RedubError, Result};
use std::process::Command;

/// Check everything `redub process` needs for the configured providers.
pub fn check_process(settings: &Settings, credentials: &Credentials) -> Result<()> {
    check_credentials(settings, credentials)?;
    check_tool("ffmpeg")?;
    check_tool("ffprobe")?;
    Ok(())
}

/// Check that every configured provider has its credentials.
pub fn check_credentials(settings: &Settings, credentials: &Credentials) -> Result<()> {
    match settings.transcription.provider {
        TranscriptionProvider::Google => credentials.require_google().map(|_| ())?,
        TranscriptionProvider::Whisper => credentials.require_openai().map(|_| ())?,
    }
    match settings.correction.provider {
        CorrectionProvider::OpenAI => credentials.require_openai().map(|_| ())?,
        CorrectionProvider::Azure => credentials.require_azure().map(|_| ())?,
    }
    match settings.synthesis.provider {
        SynthesisProvider::Google => credentials.require_google().map(|_| ())?,
        SynthesisProvider::OpenAI => credentials.require_openai().map(|_| ())?,
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(RedubError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RedubError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(RedubError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GOOGLE_API_KEY, OPENAI_API_KEY};
    use std::collections::HashMap;

    fn creds(pairs: &[(&str, &str)]) -> Credentials {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Credentials::from_map(&vars)
    }

    #[test]
    fn test_default_providers_need_google_and_openai() {
        let settings = Settings::default();
        assert!(check_credentials(&settings, &creds(&[(GOOGLE_API_KEY, "g")])).is_err());
        assert!(check_credentials(
            &settings,
            &creds(&[(GOOGLE_API_KEY, "g"), (OPENAI_API_KEY, "sk-x")])
        )
        .is_ok());
    }

    #[test]
    fn test_azure_correction_needs_url() {
        let mut settings = Settings::default();
        settings.correction.provider = CorrectionProvider::Azure;
        let err = check_credentials(&settings, &creds(&[(GOOGLE_API_KEY, "g")])).unwrap_err();
        assert!(err.to_string().contains("AZURE_API_KEY"));
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            check_tool("redub-no-such-tool"),
            Err(RedubError::ToolNotFound(_))
        ));
    }
}
