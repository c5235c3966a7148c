//! Configuration settings for Redub.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ingest: IngestSettings,
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub correction: CorrectionSettings,
    pub synthesis: SynthesisSettings,
    pub reconcile: ReconcileSettings,
    pub remux: RemuxSettings,
    pub cleanup: CleanupSettings,
    pub output: OutputSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root directory for per-run scratch namespaces.
    pub temp_dir: String,
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/redub".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl GeneralSettings {
    /// Effective log level: each `-v` raises verbosity, otherwise `log_level`.
    pub fn effective_log_level(&self, verbose: u8) -> &str {
        match verbose {
            0 => &self.log_level,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Upload validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Longest accepted video, in seconds.
    pub max_duration_seconds: f64,
    /// Accepted container extensions (lowercase, without dot).
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_duration_seconds: 60.0,
            allowed_extensions: ["mp4", "mov", "avi", "webm", "mkv", "m4v"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Audio extraction and normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate of the PCM track demuxed from the video.
    pub extraction_sample_rate: u32,
    /// Sample rate expected by the transcription service.
    pub transcription_sample_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            extraction_sample_rate: 16_000,
            transcription_sample_rate: 16_000,
        }
    }
}

/// Transcription provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// Google Cloud Speech-to-Text (default).
    #[default]
    Google,
    /// OpenAI Whisper.
    Whisper,
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(TranscriptionProvider::Google),
            "whisper" | "openai" => Ok(TranscriptionProvider::Whisper),
            _ => Err(format!("Unknown transcription provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionProvider::Google => write!(f, "google"),
            TranscriptionProvider::Whisper => write!(f, "whisper"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    /// BCP-47 language tag sent with every request.
    pub language: String,
    /// Model name (whisper provider only).
    pub model: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::Google,
            language: "en-US".to_string(),
            model: "whisper-1".to_string(),
        }
    }
}

/// Correction provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionProvider {
    #[default]
    OpenAI,
    /// Azure OpenAI deployment, addressed by `AZURE_API_URL`.
    Azure,
}

impl std::fmt::Display for CorrectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrectionProvider::OpenAI => write!(f, "openai"),
            CorrectionProvider::Azure => write!(f, "azure"),
        }
    }
}

/// Transcript correction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    pub provider: CorrectionProvider,
    /// Chat model (openai provider; Azure uses the deployment's model).
    pub model: String,
    pub max_tokens: u32,
    /// Fallback API version when `AZURE_API_URL` does not carry one.
    pub azure_api_version: String,
    /// Deployment name; overrides the one found in `AZURE_API_URL`.
    pub azure_deployment: Option<String>,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            provider: CorrectionProvider::OpenAI,
            model: "gpt-4o".to_string(),
            max_tokens: 500,
            azure_api_version: "2024-02-15-preview".to_string(),
            azure_deployment: None,
        }
    }
}

/// Speech synthesis provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisProvider {
    /// Google Cloud Text-to-Speech (default).
    #[default]
    Google,
    OpenAI,
}

impl std::fmt::Display for SynthesisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisProvider::Google => write!(f, "google"),
            SynthesisProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub provider: SynthesisProvider,
    /// Voice identifier (Google voice name, or OpenAI voice like "alloy").
    pub voice: String,
    pub language: String,
    /// TTS model (openai provider only).
    pub model: String,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            provider: SynthesisProvider::Google,
            voice: "en-US-Journey-D".to_string(),
            language: "en-US".to_string(),
            model: "tts-1".to_string(),
        }
    }
}

/// Duration reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Largest accepted |audio - video| duration gap, in seconds.
    pub tolerance_seconds: f64,
    /// Smallest synthesized/video ratio that is still stretched.
    pub min_ratio: f64,
    /// Largest synthesized/video ratio that is still stretched.
    pub max_ratio: f64,
    /// WSOLA analysis window length in milliseconds.
    pub window_ms: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            tolerance_seconds: 0.5,
            min_ratio: 0.1,
            max_ratio: 10.0,
            window_ms: 30,
        }
    }
}

/// Remux encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxSettings {
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for RemuxSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// Scratch release settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 1000,
        }
    }
}

impl CleanupSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Output naming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// File stem of the delivered video; the extension follows the container.
    pub file_stem: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            file_stem: "processed_video".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings: Settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::RedubError;

        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(RedubError::Config(format!(
                "general.log_level must be one of {} (got '{}')",
                LOG_LEVELS.join(", "),
                self.general.log_level
            )));
        }

        let r = &self.reconcile;
        if !(r.tolerance_seconds >= 0.0) {
            return Err(RedubError::Config(
                "reconcile.tolerance_seconds must be non-negative".to_string(),
            ));
        }
        if !(r.min_ratio > 0.0 && r.min_ratio < 1.0 && r.max_ratio > 1.0) {
            return Err(RedubError::Config(format!(
                "reconcile ratio bounds must satisfy 0 < min_ratio < 1 < max_ratio (got {} and {})",
                r.min_ratio, r.max_ratio
            )));
        }
        if r.window_ms == 0 {
            return Err(RedubError::Config("reconcile.window_ms must be positive".to_string()));
        }
        if self.audio.extraction_sample_rate == 0 || self.audio.transcription_sample_rate == 0 {
            return Err(RedubError::Config("audio sample rates must be positive".to_string()));
        }
        if self.cleanup.max_attempts == 0 {
            return Err(RedubError::Config("cleanup.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RedubError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("redub")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.ingest.max_duration_seconds, 60.0);
        assert_eq!(settings.audio.transcription_sample_rate, 16_000);
        assert_eq!(settings.reconcile.tolerance_seconds, 0.5);
        assert_eq!(settings.cleanup.max_attempts, 5);
        assert_eq!(settings.synthesis.voice, "en-US-Journey-D");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_level_applies_without_verbose_flag() {
        let mut settings = Settings::default();
        assert_eq!(settings.general.effective_log_level(0), "warn");

        settings.general.log_level = "debug".to_string();
        assert_eq!(settings.general.effective_log_level(0), "debug");
        assert_eq!(settings.general.effective_log_level(1), "info");
        assert_eq!(settings.general.effective_log_level(3), "trace");

        settings.general.log_level = "loud".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [reconcile]
            tolerance_seconds = 0.25

            [transcription]
            provider = "whisper"
            "#,
        )
        .unwrap();

        assert_eq!(settings.reconcile.tolerance_seconds, 0.25);
        assert_eq!(settings.reconcile.max_ratio, 10.0);
        assert_eq!(settings.transcription.provider, TranscriptionProvider::Whisper);
        assert_eq!(settings.transcription.language, "en-US");
    }

    #[test]
    fn test_validate_rejects_inverted_ratio_bounds() {
        let mut settings = Settings::default();
        settings.reconcile.min_ratio = 2.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Google".parse::<TranscriptionProvider>(), Ok(TranscriptionProvider::Google));
        assert_eq!("openai".parse::<TranscriptionProvider>(), Ok(TranscriptionProvider::Whisper));
        assert!("azure".parse::<TranscriptionProvider>().is_err());
    }
}
