//! Redub - re-voice the speech in short videos
//!
//! Takes a short video, transcribes what is said, has a language model clean
//! up the grammar and filler words, synthesizes the corrected text, and puts
//! the new voice back over the original picture at the original length.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings, prompts and service credentials
//! - `media` - Media assets and the ffmpeg/ffprobe toolkit
//! - `ingest` - Upload validation and persistence
//! - `audio` - Extraction, normalization, WAV I/O and time stretching
//! - `transcription` - Speech-to-text (Google, Whisper)
//! - `correction` - Transcript grammar correction (OpenAI, Azure OpenAI)
//! - `synthesis` - Text-to-speech (Google, OpenAI)
//! - `reconcile` - Fitting synthesized speech to the video duration
//! - `remux` - Replacing the audio track
//! - `delivery` - Handing the finished video to the caller
//! - `run` - Per-run scratch storage and cleanup
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use redub::config::{Credentials, Settings};
//! use redub::ingest::Upload;
//! use redub::orchestrator::Orchestrator;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings, &Credentials::from_env())?;
//!
//!     let upload = Upload::from_path(Path::new("clip.mp4")).await?;
//!     let report = orchestrator.process_video(&upload, Path::new(".")).await?;
//!     println!("Wrote {}", report.output.path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod correction;
pub mod delivery;
pub mod error;
pub mod google;
pub mod ingest;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod reconcile;
pub mod remux;
pub mod run;
pub mod synthesis;
pub mod transcription;

pub use error::{RedubError, Result};
