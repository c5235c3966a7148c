//! Transcript model.

use crate::error::{RedubError, Result};
use serde::{Deserialize, Serialize};

/// Where a transcript's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Straight from speech recognition.
    Raw,
    /// Rewritten by the correction model.
    Corrected,
}

/// Transcript text with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub provenance: Provenance,
}

impl Transcript {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Raw,
        }
    }

    pub fn corrected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Corrected,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Join recognition results into one transcript.
///
/// Each piece is trimmed and blank pieces are dropped; the rest are joined by
/// single spaces. Nothing left is a transcription error.
pub fn join_results<I, S>(pieces: I) -> Result<Transcript>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let text = pieces
        .into_iter()
        .filter_map(|p| {
            let p = p.as_ref().trim();
            (!p.is_empty()).then(|| p.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return Err(RedubError::Transcription("empty transcript".to_string()));
    }
    Ok(Transcript::raw(text))
}
