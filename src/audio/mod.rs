//! Audio processing for the redub pipeline.
//!
//! - `extract` demuxes the spoken track out of the uploaded video
//! - `normalize` downmixes and resamples it for the transcription service
//! - `stretch` changes the duration of synthesized speech without shifting pitch
//! - `wav` reads and writes PCM files

mod extract;
mod normalize;
mod stretch;
mod wav;

pub use extract::{extract_audio, load_wav_asset};
pub use normalize::{downmix, normalize_file, resample_linear};
pub use stretch::{time_stretch, StretchError};
pub use wav::{probe_wav, read_wav, read_wav_from, write_wav, write_wav_to, WavEncoding, WavInfo};

/// Decoded PCM audio with interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}
