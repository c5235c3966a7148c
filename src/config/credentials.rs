//! Service credentials, read from the environment once at startup.

use crate::error::{RedubError, Result};
use std::collections::HashMap;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const AZURE_API_KEY: &str = "AZURE_API_KEY";
pub const AZURE_API_URL: &str = "AZURE_API_URL";

/// API keys and endpoints for the external services.
///
/// Built once per process and handed to the orchestrator; stage code never
/// reads the environment itself.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_api_url: Option<String>,
}

impl Credentials {
    /// Read credentials from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get(OPENAI_API_KEY),
            google_api_key: get(GOOGLE_API_KEY),
            azure_api_key: get(AZURE_API_KEY),
            azure_api_url: get(AZURE_API_URL),
        }
    }

    pub fn require_openai(&self) -> Result<&str> {
        require(&self.openai_api_key, OPENAI_API_KEY)
    }

    pub fn require_google(&self) -> Result<&str> {
        require(&self.google_api_key, GOOGLE_API_KEY)
    }

    pub fn require_azure(&self) -> Result<(&str, &str)> {
        Ok((
            require(&self.azure_api_key, AZURE_API_KEY)?,
            require(&self.azure_api_url, AZURE_API_URL)?,
        ))
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| {
        RedubError::Config(format!("{} not set. Set it with: export {}='...'", name, name))
    })
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("google_api_key", &mask(&self.google_api_key))
            .field("azure_api_key", &mask(&self.azure_api_key))
            .field("azure_api_url", &self.azure_api_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_unset() {
        let mut vars = HashMap::new();
        vars.insert(OPENAI_API_KEY.to_string(), "  ".to_string());
        vars.insert(GOOGLE_API_KEY.to_string(), "g-key".to_string());

        let creds = Credentials::from_map(&vars);
        assert!(creds.require_openai().is_err());
        assert_eq!(creds.require_google().unwrap(), "g-key");
    }

    #[test]
    fn test_debug_masks_keys() {
        let mut vars = HashMap::new();
        vars.insert(OPENAI_API_KEY.to_string(), "sk-secret".to_string());
        let debug = format!("{:?}", Credentials::from_map(&vars));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<set>"));
    }
}
