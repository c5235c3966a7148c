//! Audio track replacement.

use crate::config::RemuxSettings;
use crate::error::{RedubError, Result};
use crate::media::{MediaAsset, MediaKind, MediaTools, RemuxJob};
use crate::run::PipelineRun;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Output container of the remuxed video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mov,
    Mkv,
    M4v,
}

impl Container {
    /// Keep the input container when it can carry H.264 + AAC, else mp4.
    pub fn for_input(extension: Option<&str>) -> Self {
        match extension.map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("mov") => Container::Mov,
            Some("mkv") => Container::Mkv,
            Some("m4v") => Container::M4v,
            _ => Container::Mp4,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
            Container::Mkv => "mkv",
            Container::M4v => "m4v",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Container::Mp4 | Container::M4v => "video/mp4",
            Container::Mov => "video/quicktime",
            Container::Mkv => "video/x-matroska",
        }
    }
}

/// Replace the audio of `video` with `audio`.
///
/// The output is written to a reserved scratch path, re-encoded with the
/// configured codecs, and cut at the video's duration; short audio is padded
/// with silence. Compressed audio is decoded to WAV first.
#[instrument(skip_all, fields(video = %video.path.display(), audio = %audio.path.display()))]
pub async fn remux(
    tools: &dyn MediaTools,
    run: &mut PipelineRun,
    video: &MediaAsset,
    audio: &MediaAsset,
    settings: &RemuxSettings,
) -> Result<(MediaAsset, Container)> {
    let audio = match audio.kind {
        MediaKind::AudioWav => audio.clone(),
        MediaKind::AudioMp3 => {
            let wav = run.reserve(MediaKind::AudioWav, "remux-input.wav");
            tools.transcode_to_wav(&audio.path, &wav).await?;
            MediaAsset::new(wav, MediaKind::AudioWav, audio.duration)
        }
        MediaKind::Video => {
            return Err(RedubError::Remux(
                "replacement audio must be an audio asset".to_string(),
            ))
        }
    };

    let container = Container::for_input(video.extension().as_deref());
    let output = run.reserve(MediaKind::Video, &format!("output.{}", container.extension()));

    let job = RemuxJob {
        video: &video.path,
        audio: &audio.path,
        output: &output,
        duration: video.duration,
        video_codec: &settings.video_codec,
        audio_codec: &settings.audio_codec,
    };
    tools
        .remux(&job)
        .await
        .map_err(|e| RedubError::Remux(e.to_string()))?;

    let probe = tools
        .probe(&output)
        .await
        .map_err(|e| RedubError::Remux(format!("could not read remuxed video: {}", e)))?;
    if !probe.has_video || probe.audio.is_none() {
        return Err(RedubError::Remux(
            "remuxed video is missing its picture or audio stream".to_string(),
        ));
    }

    let duration = probe.picture_duration();
    if (duration - video.duration).abs() > 0.1 {
        warn!(
            "Remuxed duration {:.3}s differs from source {:.3}s",
            duration, video.duration
        );
    }
    info!("Remuxed {:.2}s .{} video", duration, container.extension());

    Ok((MediaAsset::new(output, MediaKind::Video, duration), container))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_follows_input_when_supported() {
        assert_eq!(Container::for_input(Some("MOV")), Container::Mov);
        assert_eq!(Container::for_input(Some("mkv")), Container::Mkv);
        assert_eq!(Container::for_input(Some("m4v")), Container::M4v);
        assert_eq!(Container::for_input(Some("mp4")), Container::Mp4);
    }

    #[test]
    fn test_container_falls_back_to_mp4() {
        assert_eq!(Container::for_input(Some("avi")), Container::Mp4);
        assert_eq!(Container::for_input(Some("webm")), Container::Mp4);
        assert_eq!(Container::for_input(None), Container::Mp4);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(Container::Mp4.mime_type(), "video/mp4");
        assert_eq!(Container::Mov.mime_type(), "video/quicktime");
        assert_eq!(Container::Mkv.mime_type(), "video/x-matroska");
    }
}
