//! Pipeline orchestrator for Redub.
//!
//! Drives one upload through ingest, extraction, normalization, transcription,
//! correction, synthesis, duration reconciliation, remux and delivery, then
//! releases every scratch file the run created.

use crate::audio::{extract_audio, load_wav_asset, normalize_file};
use crate::config::{Credentials, Prompts, Settings};
use crate::correction::{create_corrector, Corrector};
use crate::delivery::{deliver, Deliverable};
use crate::error::{RedubError, Result};
use crate::ingest::{ingest, Upload};
use crate::media::{FfmpegTools, MediaAsset, MediaKind, MediaTools};
use crate::reconcile::{ReconcilePlan, Reconciler, Reconciliation};
use crate::remux::remux;
use crate::run::{CleanupPolicy, CleanupReport, PipelineRun, Stage};
use crate::synthesis::{create_synthesizer, Synthesizer};
use crate::transcription::{create_transcriber, Transcriber, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub raw_transcript: Transcript,
    pub corrected_transcript: Transcript,
    pub video_duration: f64,
    pub synthesized_duration: f64,
    pub reconciliation: Reconciliation,
    pub output: Deliverable,
    pub cleanup: CleanupReport,
}

/// Stage results gathered before cleanup.
struct StageOutputs {
    raw_transcript: Transcript,
    corrected_transcript: Transcript,
    video_duration: f64,
    synthesized_duration: f64,
    reconciliation: Reconciliation,
    output: Deliverable,
}

/// The main orchestrator for the Redub pipeline.
pub struct Orchestrator {
    settings: Settings,
    tools: Arc<dyn MediaTools>,
    transcriber: Arc<dyn Transcriber>,
    corrector: Arc<dyn Corrector>,
    synthesizer: Arc<dyn Synthesizer>,
    reconciler: Reconciler,
    temp_root: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator wired to the configured services and ffmpeg.
    pub fn new(settings: Settings, credentials: &Credentials) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        info!(
            "Using {} transcription, {} correction, {} synthesis",
            settings.transcription.provider,
            settings.correction.provider,
            settings.synthesis.provider
        );

        let transcriber = create_transcriber(
            &settings.transcription,
            settings.audio.transcription_sample_rate,
            credentials,
        )?;
        let corrector =
            create_corrector(&settings.correction, &prompts.correction.system, credentials)?;
        let synthesizer = create_synthesizer(&settings.synthesis, credentials)?;

        Self::with_components(
            settings,
            Arc::new(FfmpegTools::new()),
            transcriber,
            corrector,
            synthesizer,
        )
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        tools: Arc<dyn MediaTools>,
        transcriber: Arc<dyn Transcriber>,
        corrector: Arc<dyn Corrector>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Result<Self> {
        settings.validate()?;
        let temp_root = settings.temp_dir();
        std::fs::create_dir_all(&temp_root)?;

        Ok(Self {
            reconciler: Reconciler::new(&settings.reconcile),
            settings,
            tools,
            transcriber,
            corrector,
            synthesizer,
            temp_root,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the whole pipeline for one upload.
    pub async fn process_video(
        &self,
        upload: &Upload,
        destination: &Path,
    ) -> Result<ProcessReport> {
        self.process_video_with_progress(upload, destination, &|_| {}).await
    }

    /// Run the whole pipeline, calling `on_stage` as each stage starts.
    ///
    /// Scratch storage is released exactly once whether the run succeeds or
    /// fails. On failure the error carries the failing stage and nothing is
    /// written to `destination`.
    #[instrument(skip(self, upload, on_stage), fields(destination = %destination.display()))]
    pub async fn process_video_with_progress(
        &self,
        upload: &Upload,
        destination: &Path,
        on_stage: &(dyn Fn(Stage) + Send + Sync),
    ) -> Result<ProcessReport> {
        let policy = CleanupPolicy::from(&self.settings.cleanup);
        let mut run = PipelineRun::start(&self.temp_root, policy)?;
        let run_id = run.id();
        let started_at = run.started_at();

        let result = self.run_stages(&mut run, upload, destination, on_stage).await;

        match &result {
            Ok(outputs) => {
                let delivered = MediaAsset::new(
                    outputs.output.path.clone(),
                    MediaKind::Video,
                    outputs.video_duration,
                );
                run.succeed(delivered);
            }
            Err(e) => run.fail(e),
        }

        on_stage(Stage::Cleanup);
        let cleanup = run.finish_async().await;
        let outputs = result?;

        Ok(ProcessReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            raw_transcript: outputs.raw_transcript,
            corrected_transcript: outputs.corrected_transcript,
            video_duration: outputs.video_duration,
            synthesized_duration: outputs.synthesized_duration,
            reconciliation: outputs.reconciliation,
            output: outputs.output,
            cleanup,
        })
    }

    async fn run_stages(
        &self,
        run: &mut PipelineRun,
        upload: &Upload,
        destination: &Path,
        on_stage: &(dyn Fn(Stage) + Send + Sync),
    ) -> Result<StageOutputs> {
        let tools = self.tools.as_ref();
        let settings = &self.settings;

        let enter = |run: &mut PipelineRun, stage: Stage| {
            run.enter(stage);
            on_stage(stage);
        };

        enter(run, Stage::Ingest);
        let video = ingest(upload, run, tools, &settings.ingest)
            .await
            .map_err(|e| e.in_stage(Stage::Ingest))?;
        let video_duration = video.asset.duration;

        enter(run, Stage::Extract);
        let extracted_path = run.reserve(MediaKind::AudioWav, "extracted.wav");
        let extracted = extract_audio(
            tools,
            &video.asset,
            &video.probe,
            &extracted_path,
            settings.audio.extraction_sample_rate,
        )
        .await
        .map_err(|e| e.in_stage(Stage::Extract))?;

        enter(run, Stage::Normalize);
        let normalized_path = run.reserve(MediaKind::AudioWav, "normalized.wav");
        let target_rate = settings.audio.transcription_sample_rate;
        let source = extracted.path.clone();
        let normalized = tokio::task::spawn_blocking(move || {
            normalize_file(&source, &normalized_path, target_rate)
        })
        .await
        .map_err(|e| RedubError::Normalization(e.to_string()))?
        .map_err(|e| e.in_stage(Stage::Normalize))?;

        enter(run, Stage::Transcribe);
        let raw_transcript = self
            .transcriber
            .transcribe(&normalized)
            .await
            .map_err(|e| e.in_stage(Stage::Transcribe))?;
        info!("Raw transcript: {}", raw_transcript);

        enter(run, Stage::Correct);
        let corrected_transcript = self
            .corrector
            .correct(&raw_transcript)
            .await
            .map_err(|e| e.in_stage(Stage::Correct))?;
        info!("Corrected transcript: {}", corrected_transcript);

        enter(run, Stage::Synthesize);
        let mp3_path = run.reserve(MediaKind::AudioMp3, "synthesized.mp3");
        let synthesized_wav_path = run.reserve(MediaKind::AudioWav, "synthesized.wav");
        let synthesized = async {
            let mp3 = self.synthesizer.synthesize(&corrected_transcript.text).await?;
            tokio::fs::write(&mp3_path, &mp3).await?;
            tools.transcode_to_wav(&mp3_path, &synthesized_wav_path).await?;
            load_wav_asset(&synthesized_wav_path)
        }
        .await
        .map_err(|e| e.in_stage(Stage::Synthesize))?;
        let synthesized_duration = synthesized.duration;

        enter(run, Stage::Reconcile);
        let plan = self.reconciler.plan(synthesized_duration, video_duration);
        let stretched_slot = matches!(plan, ReconcilePlan::Stretch { .. })
            .then(|| run.reserve(MediaKind::AudioWav, "stretched.wav"));
        let reconciler = self.reconciler.clone();
        let unstretched = synthesized.clone();
        let joined = tokio::task::spawn_blocking(move || {
            reconciler.apply(&synthesized, video_duration, plan, stretched_slot.as_deref())
        })
        .await;
        let reconciliation =
            settle_reconciliation(&self.reconciler, joined, &unstretched, video_duration);

        enter(run, Stage::Remux);
        let (output, container) = remux(
            tools,
            run,
            &video.asset,
            &reconciliation.asset,
            &settings.remux,
        )
        .await
        .map_err(|e| e.in_stage(Stage::Remux))?;

        enter(run, Stage::Deliver);
        let delivered = deliver(&output, container, destination, &settings.output.file_stem)
            .await
            .map_err(|e| e.in_stage(Stage::Deliver))?;

        Ok(StageOutputs {
            raw_transcript,
            corrected_transcript,
            video_duration,
            synthesized_duration,
            reconciliation,
            output: delivered,
        })
    }
}

/// A reconcile task that died still leaves the unstretched audio usable.
fn settle_reconciliation(
    reconciler: &Reconciler,
    joined: std::result::Result<Reconciliation, tokio::task::JoinError>,
    unstretched: &MediaAsset,
    video_duration: f64,
) -> Reconciliation {
    joined.unwrap_or_else(|e| reconciler.fall_back(unstretched, video_duration, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{write_wav, PcmBuffer, WavEncoding};
    use crate::media::{AudioStreamInfo, ProbeReport, RemuxJob};
    use crate::reconcile::ReconcileAction;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SYNTH_RATE: u32 = 8_000;

    /// Media toolkit that fabricates WAV files instead of running ffmpeg.
    struct FakeTools {
        video_seconds: f64,
        synthesized_seconds: f64,
        source_has_audio: bool,
        remux_failure: Option<&'static str>,
        remuxed: Mutex<Option<f64>>,
    }

    impl FakeTools {
        fn new(video_seconds: f64, synthesized_seconds: f64) -> Self {
            Self {
                video_seconds,
                synthesized_seconds,
                source_has_audio: true,
                remux_failure: None,
                remuxed: Mutex::new(None),
            }
        }

        fn without_source_audio(mut self) -> Self {
            self.source_has_audio = false;
            self
        }

        fn failing_remux(mut self, message: &'static str) -> Self {
            self.remux_failure = Some(message);
            self
        }

        fn report(duration: f64, has_audio: bool) -> ProbeReport {
            ProbeReport {
                duration,
                video_duration: Some(duration),
                has_video: true,
                audio: has_audio.then(|| AudioStreamInfo {
                    codec: Some("aac".into()),
                    sample_rate: Some(48_000),
                    channels: Some(2),
                    duration: Some(duration),
                }),
            }
        }
    }

    fn tone(seconds: f64, channels: u16, rate: u32) -> PcmBuffer {
        let frames = (seconds * rate as f64).round() as usize;
        let samples = (0..frames)
            .flat_map(|i| {
                let t = i as f64 / rate as f64;
                let s = (0.3 * (2.0 * std::f64::consts::PI * 200.0 * t).sin()) as f32;
                std::iter::repeat(s).take(channels as usize)
            })
            .collect();
        PcmBuffer::new(samples, channels, rate)
    }

    #[async_trait]
    impl MediaTools for FakeTools {
        async fn probe(&self, path: &Path) -> Result<ProbeReport> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.starts_with("output") {
                let duration = self.remuxed.lock().unwrap().ok_or_else(|| {
                    RedubError::ToolFailed("probed output before remux".into())
                })?;
                Ok(Self::report(duration, true))
            } else {
                Ok(Self::report(self.video_seconds, self.source_has_audio))
            }
        }

        async fn extract_audio(
            &self,
            _video: &Path,
            output: &Path,
            sample_rate: u32,
        ) -> Result<()> {
            write_wav(output, &tone(self.video_seconds, 2, sample_rate), WavEncoding::PCM16)
        }

        async fn transcode_to_wav(&self, _input: &Path, output: &Path) -> Result<()> {
            write_wav(
                output,
                &tone(self.synthesized_seconds, 1, SYNTH_RATE),
                WavEncoding::PCM16,
            )
        }

        async fn remux(&self, job: &RemuxJob<'_>) -> Result<()> {
            assert!(job.audio.exists(), "remux audio must exist");
            if let Some(message) = self.remux_failure {
                std::fs::write(job.output, b"half a video")?;
                return Err(RedubError::ToolFailed(message.to_string()));
            }
            std::fs::write(job.output, b"remuxed video")?;
            *self.remuxed.lock().unwrap() = Some(job.duration);
            Ok(())
        }
    }

    struct FakeTranscriber(Option<&'static str>);

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, audio: &MediaAsset) -> Result<Transcript> {
            assert_eq!(audio.channels, Some(1));
            assert_eq!(audio.sample_rate, Some(16_000));
            crate::transcription::join_results(self.0)
        }
    }

    struct FakeCorrector;

    #[async_trait]
    impl Corrector for FakeCorrector {
        async fn correct(&self, raw: &Transcript) -> Result<Transcript> {
            assert_eq!(raw.text, "hello world uh this is a test");
            Ok(Transcript::corrected("Hello world, this is a test."))
        }
    }

    struct FakeSynthesizer;

    #[async_trait]
    impl Synthesizer for FakeSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            assert_eq!(text, "Hello world, this is a test.");
            Ok(b"ID3 fake mp3".to_vec())
        }
    }

    fn settings(temp_root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.temp_dir = temp_root.to_string_lossy().to_string();
        settings.cleanup.max_attempts = 1;
        settings.cleanup.backoff_ms = 0;
        settings
    }

    fn orchestrator(
        temp_root: &Path,
        tools: FakeTools,
        transcript: Option<&'static str>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            settings(temp_root),
            Arc::new(tools),
            Arc::new(FakeTranscriber(transcript)),
            Arc::new(FakeCorrector),
            Arc::new(FakeSynthesizer),
        )
        .unwrap()
    }

    fn upload() -> Upload {
        Upload::new(b"fake mp4 bytes".to_vec(), "mp4")
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_long_speech_is_fitted_to_video() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(10.0, 12.3),
            Some("hello world uh this is a test"),
        );

        let report = orch.process_video(&upload(), dest.path()).await.unwrap();

        assert_eq!(report.raw_transcript.text, "hello world uh this is a test");
        assert_eq!(report.corrected_transcript.text, "Hello world, this is a test.");
        assert!((report.synthesized_duration - 12.3).abs() < 1e-3);
        assert!(matches!(report.reconciliation.action, ReconcileAction::Stretched { .. }));
        assert!((report.reconciliation.asset.duration - 10.0).abs() <= 0.5);
        assert!(report.reconciliation.is_in_sync());

        assert_eq!(report.video_duration, 10.0);
        assert_eq!(report.output.file_name, "processed_video.mp4");
        assert_eq!(report.output.mime_type, "video/mp4");
        assert_eq!(std::fs::read(&report.output.path).unwrap(), b"remuxed video");

        assert!(report.cleanup.is_clean());
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_output_duration_follows_video() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let tools = Arc::new(FakeTools::new(10.0, 7.0));
        let orch = Orchestrator::with_components(
            settings(scratch.path()),
            tools.clone(),
            Arc::new(FakeTranscriber(Some("hello world uh this is a test"))),
            Arc::new(FakeCorrector),
            Arc::new(FakeSynthesizer),
        )
        .unwrap();

        orch.process_video(&upload(), dest.path()).await.unwrap();

        assert_eq!(*tools.remuxed.lock().unwrap(), Some(10.0));
    }

    #[tokio::test]
    async fn test_empty_transcription_fails_and_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(scratch.path(), FakeTools::new(10.0, 12.3), None);

        let err = orch.process_video(&upload(), dest.path()).await.unwrap_err();

        assert!(matches!(err, RedubError::Transcription(_)));
        assert_eq!(err.stage(), Some(Stage::Transcribe));
        assert_eq!(entries(dest.path()), 0);
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_overlong_video_is_rejected_at_ingest() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(90.0, 12.3),
            Some("hello world uh this is a test"),
        );

        let err = orch.process_video(&upload(), dest.path()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Ingest));
        assert_eq!(err.to_string(), "Video must be less than 1 minute");
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_silent_synthesis_is_remuxed_unstretched() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(10.0, 0.0),
            Some("hello world uh this is a test"),
        );

        let report = orch.process_video(&upload(), dest.path()).await.unwrap();

        assert!(matches!(report.reconciliation.action, ReconcileAction::Skipped { .. }));
        assert!(report.reconciliation.divergence.is_some());
        assert!(report.output.path.exists());
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_stages_are_reported_in_order() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(10.0, 10.2),
            Some("hello world uh this is a test"),
        );
        let seen = Mutex::new(Vec::new());

        orch.process_video_with_progress(&upload(), dest.path(), &|stage| {
            seen.lock().unwrap().push(stage)
        })
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Stage::Ingest,
                Stage::Extract,
                Stage::Normalize,
                Stage::Transcribe,
                Stage::Correct,
                Stage::Synthesize,
                Stage::Reconcile,
                Stage::Remux,
                Stage::Deliver,
                Stage::Cleanup,
            ]
        );
    }

    #[tokio::test]
    async fn test_video_without_audio_fails_extraction() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(10.0, 12.3).without_source_audio(),
            Some("hello world uh this is a test"),
        );

        let err = orch.process_video(&upload(), dest.path()).await.unwrap_err();

        assert!(matches!(err, RedubError::Extraction(_)));
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert_eq!(entries(scratch.path()), 0);
        assert_eq!(entries(dest.path()), 0);
    }

    #[tokio::test]
    async fn test_remux_failure_leaves_no_output() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            scratch.path(),
            FakeTools::new(10.0, 12.3).failing_remux("codec negotiation failed"),
            Some("hello world uh this is a test"),
        );

        let err = orch.process_video(&upload(), dest.path()).await.unwrap_err();

        assert!(matches!(err, RedubError::Remux(_)));
        assert_eq!(err.stage(), Some(Stage::Remux));
        assert!(err.to_string().contains("codec negotiation failed"));
        assert_eq!(entries(scratch.path()), 0);
        assert_eq!(entries(dest.path()), 0);
    }

    #[tokio::test]
    async fn test_dead_reconcile_task_keeps_unstretched_audio() {
        let reconciler = Reconciler::new(&settings(Path::new("/tmp")).reconcile);
        let unstretched =
            MediaAsset::new("/scratch/synthesized.wav".into(), MediaKind::AudioWav, 12.3);
        let joined = tokio::task::spawn_blocking(|| -> Reconciliation {
            panic!("stretch worker died")
        })
        .await;

        let reconciliation = settle_reconciliation(&reconciler, joined, &unstretched, 10.0);

        assert!(matches!(reconciliation.action, ReconcileAction::FellBack { .. }));
        assert_eq!(reconciliation.asset, unstretched);
        assert!(reconciliation.divergence.is_some());
    }
}
