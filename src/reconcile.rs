//! Duration reconciliation between synthesized speech and the source video.
//!
//! Synthesized speech rarely matches the length of the original take. The
//! reconciler compares the two durations and, when they differ by more than the
//! tolerance, time-stretches the speech so the remuxed video stays in sync.
//! Stretch failures and pathological ratios never abort a run: the unstretched
//! audio is kept and the remaining divergence is reported.

use crate::audio::{load_wav_asset, read_wav, time_stretch, write_wav};
use crate::config::ReconcileSettings;
use crate::error::Result;
use crate::media::MediaAsset;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument, warn};

/// What the reconciler decided to do before touching any audio.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilePlan {
    /// Durations already agree within tolerance.
    PassThrough,
    /// Stretch the audio by `factor` (new duration = old duration x factor).
    Stretch { factor: f64 },
    /// The ratio is outside the sane range; leave the audio alone.
    Skip { reason: String },
}

/// What the reconciler actually did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileAction {
    PassThrough,
    Stretched { factor: f64 },
    Skipped { reason: String },
    FellBack { reason: String },
}

/// Audio/video duration gap left after reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub audio_duration: f64,
    pub video_duration: f64,
}

impl Divergence {
    /// Signed gap in seconds (positive when the audio is longer).
    pub fn seconds(&self) -> f64 {
        self.audio_duration - self.video_duration
    }
}

/// Result of reconciling one audio asset against a video duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Audio to remux: the input asset, or the stretched copy.
    pub asset: MediaAsset,
    /// synthesized duration / video duration.
    pub ratio: f64,
    pub action: ReconcileAction,
    /// Set whenever the final audio is still out of tolerance.
    pub divergence: Option<Divergence>,
}

impl Reconciliation {
    pub fn is_in_sync(&self) -> bool {
        self.divergence.is_none()
    }
}

fn duration_ratio(audio_duration: f64, video_duration: f64) -> f64 {
    if video_duration > 0.0 {
        audio_duration / video_duration
    } else {
        f64::INFINITY
    }
}

/// Duration reconciler.
#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance: f64,
    min_ratio: f64,
    max_ratio: f64,
    window_ms: u32,
}

impl Reconciler {
    pub fn new(settings: &ReconcileSettings) -> Self {
        Self {
            tolerance: settings.tolerance_seconds,
            min_ratio: settings.min_ratio,
            max_ratio: settings.max_ratio,
            window_ms: settings.window_ms,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Decide how to bring `audio_duration` in line with `video_duration`.
    pub fn plan(&self, audio_duration: f64, video_duration: f64) -> ReconcilePlan {
        if (audio_duration - video_duration).abs() <= self.tolerance {
            return ReconcilePlan::PassThrough;
        }

        if !(video_duration > 0.0) {
            return ReconcilePlan::Skip {
                reason: format!("video duration {:.3}s is not positive", video_duration),
            };
        }

        let ratio = audio_duration / video_duration;
        if !ratio.is_finite() || ratio < self.min_ratio || ratio > self.max_ratio {
            return ReconcilePlan::Skip {
                reason: format!(
                    "stretch ratio {:.3} is outside [{}, {}]",
                    ratio, self.min_ratio, self.max_ratio
                ),
            };
        }

        ReconcilePlan::Stretch { factor: 1.0 / ratio }
    }

    /// Carry out `plan` for `audio`.
    ///
    /// `stretched_path` is where a stretched copy is written; it is only used
    /// for [`ReconcilePlan::Stretch`]. Never fails: stretch errors fall back to
    /// the unstretched audio with the divergence flagged.
    #[instrument(skip(self, audio, stretched_path), fields(audio = %audio.path.display()))]
    pub fn apply(
        &self,
        audio: &MediaAsset,
        video_duration: f64,
        plan: ReconcilePlan,
        stretched_path: Option<&Path>,
    ) -> Reconciliation {
        let ratio = duration_ratio(audio.duration, video_duration);

        let (asset, action) = match plan {
            ReconcilePlan::PassThrough => {
                info!(
                    "Audio {:.2}s vs video {:.2}s within tolerance, no stretch",
                    audio.duration, video_duration
                );
                (audio.clone(), ReconcileAction::PassThrough)
            }
            ReconcilePlan::Skip { reason } => {
                warn!("Skipping time stretch: {}", reason);
                (audio.clone(), ReconcileAction::Skipped { reason })
            }
            ReconcilePlan::Stretch { factor } => {
                let result = match stretched_path {
                    Some(path) => self.stretch_file(audio, video_duration, path),
                    None => Err(crate::error::RedubError::Reconciliation(
                        "no output path for stretched audio".to_string(),
                    )),
                };
                match result {
                    Ok(stretched) => {
                        info!(
                            "Stretched audio {:.2}s -> {:.2}s (factor {:.3})",
                            audio.duration, stretched.duration, factor
                        );
                        (stretched, ReconcileAction::Stretched { factor })
                    }
                    Err(e) => {
                        warn!("Time stretch failed, keeping unstretched audio: {}", e);
                        (audio.clone(), ReconcileAction::FellBack { reason: e.to_string() })
                    }
                }
            }
        };

        self.conclude(asset, ratio, action, video_duration)
    }

    /// Keep `audio` unstretched after the stretch could not run at all.
    pub fn fall_back(
        &self,
        audio: &MediaAsset,
        video_duration: f64,
        reason: String,
    ) -> Reconciliation {
        warn!("Time stretch did not complete, keeping unstretched audio: {}", reason);
        let ratio = duration_ratio(audio.duration, video_duration);
        let action = ReconcileAction::FellBack { reason };
        self.conclude(audio.clone(), ratio, action, video_duration)
    }

    fn conclude(
        &self,
        asset: MediaAsset,
        ratio: f64,
        action: ReconcileAction,
        video_duration: f64,
    ) -> Reconciliation {
        let divergence = ((asset.duration - video_duration).abs() > self.tolerance).then(|| {
            Divergence {
                audio_duration: asset.duration,
                video_duration,
            }
        });

        if let Some(d) = &divergence {
            warn!(
                "Audio remains {:+.2}s off the video duration (tolerance {:.2}s)",
                d.seconds(),
                self.tolerance
            );
        }

        Reconciliation {
            asset,
            ratio,
            action,
            divergence,
        }
    }

    /// Plan and apply in one step.
    pub fn reconcile(
        &self,
        audio: &MediaAsset,
        video_duration: f64,
        stretched_path: &Path,
    ) -> Reconciliation {
        let plan = self.plan(audio.duration, video_duration);
        self.apply(audio, video_duration, plan, Some(stretched_path))
    }

    fn stretch_file(
        &self,
        audio: &MediaAsset,
        video_duration: f64,
        output: &Path,
    ) -> Result<MediaAsset> {
        let (buffer, encoding) = read_wav(&audio.path)?;
        let target_frames = (video_duration * buffer.sample_rate as f64).round() as usize;
        let stretched = time_stretch(&buffer, target_frames, self.window_ms)?;
        write_wav(output, &stretched, encoding)?;
        load_wav_asset(output)
    }
}
