//! Upload validation and persistence.

use crate::config::IngestSettings;
use crate::error::{RedubError, Result};
use crate::media::{MediaAsset, MediaKind, MediaTools, ProbeReport};
use crate::run::PipelineRun;
use std::path::Path;
use tracing::{info, instrument};

/// A video submitted for processing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// Declared container extension, with or without a leading dot.
    pub extension: String,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }

    /// Read an upload from a local file, taking the extension from its name.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let extension = crate::media::extension_of(path).ok_or_else(|| {
            RedubError::InvalidInput(format!("{} has no file extension", path.display()))
        })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { bytes, extension })
    }

    /// Lowercased extension without the leading dot.
    pub fn normalized_extension(&self) -> String {
        self.extension.trim().trim_start_matches('.').to_lowercase()
    }
}

/// Ingested video with its probe results.
#[derive(Debug, Clone)]
pub struct IngestedVideo {
    pub asset: MediaAsset,
    pub probe: ProbeReport,
}

/// Persist `upload` into the run's scratch namespace and validate it.
#[instrument(skip(upload, run, tools, settings), fields(bytes = upload.bytes.len()))]
pub async fn ingest(
    upload: &Upload,
    run: &mut PipelineRun,
    tools: &dyn MediaTools,
    settings: &IngestSettings,
) -> Result<IngestedVideo> {
    let extension = upload.normalized_extension();
    if !settings.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
        return Err(RedubError::Ingest(format!(
            "Unsupported file type '.{}'. Allowed: {}",
            extension,
            settings.allowed_extensions.join(", ")
        )));
    }
    if upload.bytes.is_empty() {
        return Err(RedubError::Ingest("The uploaded file is empty".to_string()));
    }

    let path = run.reserve(MediaKind::Video, &format!("source.{}", extension));
    tokio::fs::write(&path, &upload.bytes).await?;

    let probe = tools
        .probe(&path)
        .await
        .map_err(|e| RedubError::Ingest(format!("Could not read the uploaded video: {}", e)))?;

    if !probe.has_video {
        return Err(RedubError::Ingest(
            "The uploaded file has no video stream".to_string(),
        ));
    }

    let duration = probe.picture_duration();
    if duration > settings.max_duration_seconds {
        return Err(RedubError::Ingest(duration_cap_message(settings.max_duration_seconds)));
    }

    info!("Ingested {:.2}s .{} video", duration, extension);

    Ok(IngestedVideo {
        asset: MediaAsset::new(path, MediaKind::Video, duration),
        probe,
    })
}

fn duration_cap_message(max_seconds: f64) -> String {
    if max_seconds == 60.0 {
        "Video must be less than 1 minute".to_string()
    } else {
        format!("Video must be less than {} seconds", max_seconds)
    }
}
