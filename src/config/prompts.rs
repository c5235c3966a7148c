//! Prompt templates for Redub.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompt for grammar correction of the raw transcript.
    pub correction: CorrectionPrompts,
}

/// Prompts for transcript correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPrompts {
    pub system: String,
}

impl Default for CorrectionPrompts {
    fn default() -> Self {
        Self {
            system: "Correct the grammar and remove filler words.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from `custom_dir` when given.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let correction_path = custom_path.join("correction.toml");
            if correction_path.exists() {
                let content = std::fs::read_to_string(&correction_path)?;
                prompts.correction = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }
}
