//! ffmpeg/ffprobe backed media toolkit.

use super::{parse_probe_output, MediaTools, ProbeReport, RemuxJob};
use crate::error::{RedubError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Media toolkit that shells out to `ffmpeg` and `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegTools {
    /// Use `ffmpeg` and `ffprobe` from PATH.
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    /// Use specific ffmpeg/ffprobe executables.
    pub fn with_binaries(ffmpeg: &str, ffprobe: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
        }
    }

    /// Run ffmpeg with the given arguments, overwriting outputs quietly.
    async fn run_ffmpeg(&self, args: Vec<OsString>) -> Result<()> {
        debug!("{} {:?}", self.ffmpeg, args);

        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-nostdin")
            .arg("-loglevel").arg("error")
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(RedubError::ToolFailed(format!("ffmpeg failed: {}", err.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RedubError::ToolNotFound(self.ffmpeg.clone()))
            }
            Err(e) => Err(RedubError::ToolFailed(format!("ffmpeg error: {e}"))),
        }
    }
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTools for FfmpegTools {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        let result = Command::new(&self.ffprobe)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RedubError::ToolNotFound(self.ffprobe.clone()));
            }
            Err(e) => {
                return Err(RedubError::ToolFailed(format!("ffprobe failed: {e}")));
            }
        };

        if !output.status.success() {
            return Err(RedubError::ToolFailed(format!(
                "ffprobe could not read {}",
                path.display()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    #[instrument(skip(self), fields(video = %video.display()))]
    async fn extract_audio(&self, video: &Path, output: &Path, sample_rate: u32) -> Result<()> {
        self.run_ffmpeg(vec![
            "-i".into(), video.into(),
            "-map".into(), "0:a:0".into(),
            "-vn".into(),
            "-acodec".into(), "pcm_s16le".into(),
            "-ar".into(), sample_rate.to_string().into(),
            output.into(),
        ])
        .await
    }

    #[instrument(skip(self), fields(input = %input.display()))]
    async fn transcode_to_wav(&self, input: &Path, output: &Path) -> Result<()> {
        self.run_ffmpeg(vec![
            "-i".into(), input.into(),
            "-vn".into(),
            "-acodec".into(), "pcm_s16le".into(),
            output.into(),
        ])
        .await
    }

    #[instrument(skip(self, job), fields(video = %job.video.display(), duration = job.duration))]
    async fn remux(&self, job: &RemuxJob<'_>) -> Result<()> {
        self.run_ffmpeg(remux_args(job)).await
    }
}

/// Build the ffmpeg argument list for a remux job.
///
/// The picture is re-encoded from the first video stream, the replacement
/// audio is the only audio stream, padded with silence when short, and the
/// output is cut at exactly the job duration.
fn remux_args(job: &RemuxJob<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(), job.video.into(),
        "-i".into(), job.audio.into(),
        "-map".into(), "0:v:0".into(),
        "-map".into(), "1:a:0".into(),
        "-c:v".into(), job.video_codec.into(),
        "-pix_fmt".into(), "yuv420p".into(),
        "-c:a".into(), job.audio_codec.into(),
        "-af".into(), "apad".into(),
        "-t".into(), format!("{:.3}", job.duration).into(),
    ];

    if matches!(
        super::extension_of(job.output).as_deref(),
        Some("mp4" | "mov" | "m4v")
    ) {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }

    args.push(job.output.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job<'a>(output: &'a Path) -> RemuxJob<'a> {
        RemuxJob {
            video: Path::new("/scratch/source.mp4"),
            audio: Path::new("/scratch/final.wav"),
            output,
            duration: 10.0,
            video_codec: "libx264",
            audio_codec: "aac",
        }
    }

    fn as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_remux_args_replace_audio_and_fix_duration() {
        let args = as_strings(remux_args(&job(Path::new("/scratch/output.mp4"))));
        let joined = args.join(" ");

        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-af apad"));
        assert!(joined.contains("-t 10.000"));
        assert!(joined.contains("+faststart"));
        assert_eq!(args.last().map(String::as_str), Some("/scratch/output.mp4"));
    }

    #[test]
    fn test_remux_args_skip_faststart_for_matroska() {
        let args = as_strings(remux_args(&job(Path::new("/scratch/output.mkv"))));
        assert!(!args.iter().any(|a| a == "-movflags"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_tool_not_found() {
        let tools = FfmpegTools::with_binaries("redub-no-such-ffmpeg", "redub-no-such-ffprobe");
        let err = tools.probe(Path::new("/tmp/none.mp4")).await.unwrap_err();
        assert!(matches!(err, RedubError::ToolNotFound(_)));
    }
}
