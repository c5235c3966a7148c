//! Error types for Redub.

use crate::run::Stage;
use thiserror::Error;

/// Library-level error type for Redub operations.
#[derive(Error, Debug)]
pub enum RedubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Ingest(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Audio normalization failed: {0}")]
    Normalization(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Transcript correction failed: {0}")]
    Correction(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Duration reconciliation failed: {0}")]
    Reconciliation(String),

    #[error("Remux failed: {0}")]
    Remux(String),

    #[error("Could not deliver output video: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Google API error: {0}")]
    Google(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RedubError {
    /// The pipeline stage this error belongs to, if it is a stage error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RedubError::Ingest(_) => Some(Stage::Ingest),
            RedubError::Extraction(_) => Some(Stage::Extract),
            RedubError::Normalization(_) => Some(Stage::Normalize),
            RedubError::Transcription(_) => Some(Stage::Transcribe),
            RedubError::Correction(_) => Some(Stage::Correct),
            RedubError::Synthesis(_) => Some(Stage::Synthesize),
            RedubError::Reconciliation(_) => Some(Stage::Reconcile),
            RedubError::Remux(_) => Some(Stage::Remux),
            RedubError::Delivery(_) => Some(Stage::Deliver),
            _ => None,
        }
    }

    /// Attribute an error to a pipeline stage.
    ///
    /// Stage errors keep their own kind; infrastructure errors (IO, HTTP,
    /// missing tools) are folded into the kind of the stage they occurred in.
    pub fn in_stage(self, stage: Stage) -> Self {
        if self.stage().is_some() {
            return self;
        }
        let reason = self.to_string();
        match stage {
            Stage::Ingest => RedubError::Ingest(reason),
            Stage::Extract => RedubError::Extraction(reason),
            Stage::Normalize => RedubError::Normalization(reason),
            Stage::Transcribe => RedubError::Transcription(reason),
            Stage::Correct => RedubError::Correction(reason),
            Stage::Synthesize => RedubError::Synthesis(reason),
            Stage::Reconcile => RedubError::Reconciliation(reason),
            Stage::Remux => RedubError::Remux(reason),
            Stage::Deliver | Stage::Cleanup => RedubError::Delivery(reason),
        }
    }

    /// Whether the pipeline can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RedubError::Reconciliation(_))
    }
}

/// Result type alias for Redub operations.
pub type Result<T> = std::result::Result<T, RedubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_folds_infrastructure_errors() {
        let err = RedubError::ToolNotFound("ffmpeg".to_string()).in_stage(Stage::Extract);
        assert!(matches!(err, RedubError::Extraction(_)));
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert!(err.to_string().contains("ffmpeg"));
    }

    #[test]
    fn test_in_stage_keeps_stage_errors() {
        let err = RedubError::Transcription("empty transcript".to_string())
            .in_stage(Stage::Correct);
        assert_eq!(err.stage(), Some(Stage::Transcribe));
    }

    #[test]
    fn test_only_reconciliation_is_recoverable() {
        assert!(RedubError::Reconciliation("x".into()).is_recoverable());
        assert!(!RedubError::Remux("x".into()).is_recoverable());
        assert!(!RedubError::Transcription("x".into()).is_recoverable());
    }
}
