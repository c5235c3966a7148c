//! Audio track extraction.

use super::wav::probe_wav;
use crate::error::{RedubError, Result};
use crate::media::{MediaAsset, MediaKind, MediaTools, ProbeReport};
use std::path::Path;
use tracing::{info, instrument};

/// Demux the video's audio track to PCM WAV at `sample_rate`.
///
/// The full track is kept; nothing is trimmed. Fails with an extraction
/// error when the video has no audio stream or cannot be decoded.
#[instrument(skip(tools, probe), fields(video = %video.path.display()))]
pub async fn extract_audio(
    tools: &dyn MediaTools,
    video: &MediaAsset,
    probe: &ProbeReport,
    output: &Path,
    sample_rate: u32,
) -> Result<MediaAsset> {
    if probe.audio.is_none() {
        return Err(RedubError::Extraction(
            "the video has no audio track".to_string(),
        ));
    }

    tools
        .extract_audio(&video.path, output, sample_rate)
        .await
        .map_err(|e| RedubError::Extraction(e.to_string()))?;

    let asset = load_wav_asset(output).map_err(|e| RedubError::Extraction(e.to_string()))?;
    info!(
        "Extracted {:.2}s of audio ({} Hz, {} ch)",
        asset.duration,
        sample_rate,
        asset.channels.unwrap_or(0)
    );
    Ok(asset)
}

/// Describe an existing WAV file as a media asset.
pub fn load_wav_asset(path: &Path) -> Result<MediaAsset> {
    let info = probe_wav(path)?;
    Ok(
        MediaAsset::new(path.to_path_buf(), MediaKind::AudioWav, info.duration())
            .with_audio(info.sample_rate, info.channels),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{write_wav, PcmBuffer, WavEncoding};
    use crate::media::{AudioStreamInfo, RemuxJob};
    use async_trait::async_trait;

    /// Writes a short stereo WAV in place of ffmpeg's extraction.
    struct StereoExtractor;

    #[async_trait]
    impl MediaTools for StereoExtractor {
        async fn probe(&self, _path: &Path) -> Result<ProbeReport> {
            unreachable!("extraction works from the ingest probe")
        }

        async fn extract_audio(
            &self,
            _video: &Path,
            output: &Path,
            sample_rate: u32,
        ) -> Result<()> {
            let samples = vec![0.25f32; sample_rate as usize * 2];
            write_wav(output, &PcmBuffer::new(samples, 2, sample_rate), WavEncoding::PCM16)
        }

        async fn transcode_to_wav(&self, _input: &Path, _output: &Path) -> Result<()> {
            unreachable!()
        }

        async fn remux(&self, _job: &RemuxJob<'_>) -> Result<()> {
            unreachable!()
        }
    }

    fn probe(audio: Option<AudioStreamInfo>) -> ProbeReport {
        ProbeReport {
            duration: 1.0,
            video_duration: Some(1.0),
            has_video: true,
            audio,
        }
    }

    fn video() -> MediaAsset {
        MediaAsset::new("/scratch/source.mp4".into(), MediaKind::Video, 1.0)
    }

    #[tokio::test]
    async fn test_video_without_audio_track_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("extracted.wav");

        let err = extract_audio(&StereoExtractor, &video(), &probe(None), &output, 16_000)
            .await
            .unwrap_err();

        assert!(matches!(err, RedubError::Extraction(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_extraction_keeps_source_channels() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("extracted.wav");
        let audio = AudioStreamInfo {
            codec: Some("aac".into()),
            sample_rate: Some(48_000),
            channels: Some(2),
            duration: Some(1.0),
        };

        let probe = probe(Some(audio));
        let asset = extract_audio(&StereoExtractor, &video(), &probe, &output, 16_000)
            .await
            .unwrap();

        assert_eq!(asset.kind, MediaKind::AudioWav);
        assert_eq!(asset.channels, Some(2));
        assert_eq!(asset.sample_rate, Some(16_000));
        assert!((asset.duration - 1.0).abs() < 1e-9);
    }
}
