//! Configuration module for Redub.
//!
//! Handles loading application settings, prompt templates and service credentials.

mod credentials;
mod prompts;
mod settings;

pub use credentials::{
    Credentials, AZURE_API_KEY, AZURE_API_URL, GOOGLE_API_KEY, OPENAI_API_KEY,
};
pub use prompts::{CorrectionPrompts, Prompts};
pub use settings::{
    AudioSettings, CleanupSettings, CorrectionProvider, CorrectionSettings, GeneralSettings,
    IngestSettings, OutputSettings, PromptSettings, ReconcileSettings, RemuxSettings, Settings,
    SynthesisProvider, SynthesisSettings, TranscriptionProvider, TranscriptionSettings,
};
