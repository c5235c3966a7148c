//! ffprobe output parsing.

use crate::error::{RedubError, Result};
use serde::{Deserialize, Serialize};

/// Audio stream parameters reported by ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub duration: Option<f64>,
}

/// Summary of a probed media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Container duration in seconds.
    pub duration: f64,
    /// Duration of the first video stream, when the container reports one.
    pub video_duration: Option<f64>,
    pub has_video: bool,
    /// First audio stream, if any.
    pub audio: Option<AudioStreamInfo>,
}

impl ProbeReport {
    /// Duration of the picture track, falling back to the container duration.
    pub fn picture_duration(&self) -> f64 {
        self.video_duration.unwrap_or(self.duration)
    }
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json_str: &str) -> Result<ProbeReport> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| RedubError::ToolFailed("Invalid ffprobe output".into()))?;

    let duration = parse_seconds(&parsed["format"]["duration"])
        .ok_or_else(|| RedubError::ToolFailed("Could not determine media duration".into()))?;

    let streams = parsed["streams"].as_array().cloned().unwrap_or_default();

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"));

    let audio = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"))
        .map(|s| AudioStreamInfo {
            codec: s["codec_name"].as_str().map(|c| c.to_string()),
            sample_rate: s["sample_rate"]
                .as_str()
                .and_then(|r| r.parse().ok())
                .or_else(|| s["sample_rate"].as_u64().map(|r| r as u32)),
            channels: s["channels"].as_u64().map(|c| c as u16),
            duration: parse_seconds(&s["duration"]),
        });

    Ok(ProbeReport {
        duration,
        video_duration: video.and_then(|v| parse_seconds(&v["duration"])),
        has_video: video.is_some(),
        audio,
    })
}

/// ffprobe reports durations as strings; accept numbers as well.
fn parse_seconds(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|d| d.is_finite() && *d >= 0.0)
}
