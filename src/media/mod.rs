//! Media asset handles and the external media toolkit.
//!
//! Every file a pipeline run produces is described by a [`MediaAsset`]. The
//! container-level work (probing, demuxing, transcoding, remuxing) sits behind
//! the [`MediaTools`] trait; [`FfmpegTools`] implements it with ffmpeg/ffprobe.

mod ffmpeg;
mod probe;

pub use ffmpeg::FfmpegTools;
pub use probe::{parse_probe_output, AudioStreamInfo, ProbeReport};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of file held by a [`MediaAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Video,
    AudioWav,
    AudioMp3,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::AudioWav => write!(f, "audio-wav"),
            MediaKind::AudioMp3 => write!(f, "audio-mp3"),
        }
    }
}

/// A media file on scratch storage, owned by the run that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Duration in seconds.
    pub duration: f64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl MediaAsset {
    pub fn new(path: PathBuf, kind: MediaKind, duration: f64) -> Self {
        Self {
            path,
            kind,
            duration,
            sample_rate: None,
            channels: None,
        }
    }

    /// Attach audio stream parameters.
    pub fn with_audio(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = Some(sample_rate);
        self.channels = Some(channels);
        self
    }

    /// Container extension of the asset path, lowercased.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// Lowercased extension of a path.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Options for re-encoding a video with a replacement audio track.
#[derive(Debug, Clone)]
pub struct RemuxJob<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub output: &'a Path,
    /// Exact output duration in seconds.
    pub duration: f64,
    pub video_codec: &'a str,
    pub audio_codec: &'a str,
}

/// Container-level media operations.
///
/// Implementations must be stateless with respect to a run: every method reads
/// and writes only the paths it is given.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Inspect a media file.
    async fn probe(&self, path: &Path) -> Result<ProbeReport>;

    /// Demux the first audio stream to 16-bit PCM WAV at `sample_rate`,
    /// keeping the source channel layout.
    async fn extract_audio(&self, video: &Path, output: &Path, sample_rate: u32) -> Result<()>;

    /// Decode any audio file to 16-bit PCM WAV at its native rate.
    async fn transcode_to_wav(&self, input: &Path, output: &Path) -> Result<()>;

    /// Re-encode `job.video` with `job.audio` as its only audio stream.
    async fn remux(&self, job: &RemuxJob<'_>) -> Result<()>;
}
