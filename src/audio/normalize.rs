//! Mono downmix and sample-rate conversion.

use super::wav::{read_wav, write_wav, WavEncoding};
use super::PcmBuffer;
use crate::error::{RedubError, Result};
use crate::media::{MediaAsset, MediaKind};
use std::path::Path;
use tracing::{debug, instrument};

/// Average all channels of each frame into one sample.
pub fn downmix(buffer: &PcmBuffer) -> Vec<f32> {
    let channels = buffer.channels as usize;
    if channels <= 1 {
        return buffer.samples.clone();
    }

    buffer
        .samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear interpolation resampling of a mono signal.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}

/// Convert a WAV file to mono 16-bit PCM at `target_rate`.
#[instrument(fields(input = %input.display()))]
pub fn normalize_file(input: &Path, output: &Path, target_rate: u32) -> Result<MediaAsset> {
    let (buffer, _) = read_wav(input).map_err(|e| RedubError::Normalization(e.to_string()))?;

    debug!(
        "Normalizing {} ch @ {} Hz -> mono @ {} Hz",
        buffer.channels, buffer.sample_rate, target_rate
    );

    let mono = downmix(&buffer);
    let resampled = resample_linear(&mono, buffer.sample_rate, target_rate);
    let normalized = PcmBuffer::new(resampled, 1, target_rate);

    write_wav(output, &normalized, WavEncoding::PCM16)
        .map_err(|e| RedubError::Normalization(e.to_string()))?;

    Ok(
        MediaAsset::new(output.to_path_buf(), MediaKind::AudioWav, normalized.duration())
            .with_audio(target_rate, 1),
    )
}
