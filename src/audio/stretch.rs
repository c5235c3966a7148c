//! Pitch-preserving time stretch (WSOLA).
//!
//! Waveform-similarity overlap-add: Hann-windowed segments are taken from the
//! input at a hop of `hop_out / alpha` and laid down at a fixed output hop of
//! half a window. Each segment start is nudged within a small search radius to
//! the position whose waveform best continues the previously copied segment,
//! which keeps periodic signals phase-coherent. Segments are copied at the
//! original sample rate, so pitch is unchanged.

use super::PcmBuffer;
use crate::error::RedubError;
use thiserror::Error;

/// Smallest analysis window in frames.
const MIN_WINDOW_FRAMES: usize = 32;

/// Reasons a stretch cannot be performed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StretchError {
    #[error("cannot stretch audio to zero frames")]
    EmptyTarget,

    #[error("audio has {frames} frames, fewer than the {window}-frame analysis window")]
    TooShort { frames: usize, window: usize },

    #[error("invalid stretch input: {0}")]
    Invalid(String),
}

impl From<StretchError> for RedubError {
    fn from(e: StretchError) -> Self {
        RedubError::Reconciliation(e.to_string())
    }
}

/// Stretch `input` to exactly `target_frames` frames.
///
/// Sample rate and channel layout are preserved. Channels share one set of
/// segment positions (chosen on the mono mix) so they stay aligned.
pub fn time_stretch(
    input: &PcmBuffer,
    target_frames: usize,
    window_ms: u32,
) -> std::result::Result<PcmBuffer, StretchError> {
    let channels = input.channels as usize;
    if channels == 0 || input.sample_rate == 0 {
        return Err(StretchError::Invalid(format!(
            "{} channels at {} Hz",
            input.channels, input.sample_rate
        )));
    }
    if target_frames == 0 {
        return Err(StretchError::EmptyTarget);
    }

    let window = window_frames(input.sample_rate, window_ms);
    let in_frames = input.frames();
    if in_frames < window {
        return Err(StretchError::TooShort {
            frames: in_frames,
            window,
        });
    }

    let mono = super::downmix(input);
    let hann = hann_window(window);
    let hop_out = window / 2;
    let alpha = target_frames as f64 / in_frames as f64;
    let hop_in = hop_out as f64 / alpha;
    let radius = window / 4;

    let mut out = vec![0.0f32; (target_frames + window) * channels];
    let mut weight = vec![0.0f32; target_frames + window];
    let mut prev_start: isize = 0;
    let mut k = 0usize;

    loop {
        let out_pos = k * hop_out;
        if out_pos >= target_frames {
            break;
        }

        let start = if k == 0 {
            0
        } else {
            let nominal = (k as f64 * hop_in).round() as isize;
            let natural = prev_start + hop_out as isize;
            best_alignment(&mono, natural, nominal, radius, window)
        };

        for (i, &w) in hann.iter().enumerate() {
            let src = start + i as isize;
            let dst = out_pos + i;
            for c in 0..channels {
                out[dst * channels + c] += w * frame_sample(&input.samples, channels, src, c);
            }
            weight[dst] += w;
        }

        prev_start = start;
        k += 1;
    }

    out.truncate(target_frames * channels);
    for (frame, &w) in out.chunks_exact_mut(channels).zip(weight.iter()) {
        if w > 1e-6 {
            for s in frame {
                *s /= w;
            }
        }
    }

    Ok(PcmBuffer::new(out, input.channels, input.sample_rate))
}

/// Analysis window length in frames for a sample rate.
fn window_frames(sample_rate: u32, window_ms: u32) -> usize {
    let frames = (sample_rate as u64 * window_ms as u64 / 1000) as usize;
    let frames = frames.max(MIN_WINDOW_FRAMES);
    frames + frames % 2
}

/// Periodic Hann window; overlapping copies at half-window hop sum to one.
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Pick the start in `nominal ± radius` whose segment best matches the
/// natural continuation of the previous segment.
fn best_alignment(
    mono: &[f32],
    natural: isize,
    nominal: isize,
    radius: usize,
    window: usize,
) -> isize {
    let radius = radius as isize;
    let mut best = nominal;
    let mut best_score = f32::NEG_INFINITY;

    for delta in -radius..=radius {
        let candidate = nominal + delta;
        let score: f32 = (0..window as isize)
            .map(|j| sample(mono, natural + j) * sample(mono, candidate + j))
            .sum();
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }

    best
}

fn sample(mono: &[f32], idx: isize) -> f32 {
    if idx < 0 {
        return 0.0;
    }
    mono.get(idx as usize).copied().unwrap_or(0.0)
}

fn frame_sample(samples: &[f32], channels: usize, frame: isize, channel: usize) -> f32 {
    if frame < 0 {
        return 0.0;
    }
    samples
        .get(frame as usize * channels + channel)
        .copied()
        .unwrap_or(0.0)
}
