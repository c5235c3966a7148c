//! Per-run state and scratch storage.
//!
//! A [`PipelineRun`] owns a private scratch directory and an ordered ledger of
//! every file the run creates. Paths are recorded in the ledger when they are
//! reserved, before the stage that writes them runs, so a failure in the middle
//! of a stage still leaves a complete cleanup set. The ledger is released
//! exactly once: explicitly through [`PipelineRun::finish`], or by `Drop` if
//! the run is abandoned (early return, panic).

mod cleanup;

pub use cleanup::{CleanupPolicy, CleanupReport, CleanupWarning};

use cleanup::{release_path, EntryKind};
use crate::error::{RedubError, Result};
use crate::media::{MediaAsset, MediaKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Extract,
    Normalize,
    Transcribe,
    Correct,
    Synthesize,
    Reconcile,
    Remux,
    Deliver,
    Cleanup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Extract => "audio extraction",
            Stage::Normalize => "audio normalization",
            Stage::Transcribe => "transcription",
            Stage::Correct => "correction",
            Stage::Synthesize => "speech synthesis",
            Stage::Reconcile => "duration reconciliation",
            Stage::Remux => "remux",
            Stage::Deliver => "delivery",
            Stage::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded { output: MediaAsset },
    Failed { stage: Stage, reason: String },
}

/// A scratch path recorded for cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub path: PathBuf,
    pub kind: MediaKind,
}

/// State of one end-to-end pipeline invocation.
#[derive(Debug)]
pub struct PipelineRun {
    id: Uuid,
    started_at: DateTime<Utc>,
    scratch_dir: PathBuf,
    ledger: Vec<LedgerEntry>,
    stage: Stage,
    outcome: Option<RunOutcome>,
    policy: CleanupPolicy,
    released: bool,
}

impl PipelineRun {
    /// Create a run with its own scratch directory under `temp_root`.
    pub fn start(temp_root: &Path, policy: CleanupPolicy) -> Result<Self> {
        let id = Uuid::new_v4();
        let scratch_dir = temp_root.join(format!("run-{}", id));
        std::fs::create_dir_all(&scratch_dir).map_err(|e| {
            RedubError::Ingest(format!(
                "could not create scratch directory {}: {}",
                scratch_dir.display(),
                e
            ))
        })?;

        info!("Started run {} in {}", id, scratch_dir.display());

        Ok(Self {
            id,
            started_at: Utc::now(),
            scratch_dir,
            ledger: Vec::new(),
            stage: Stage::Ingest,
            outcome: None,
            policy,
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enter(&mut self, stage: Stage) {
        debug!("Run {} entering {}", self.id, stage);
        self.stage = stage;
    }

    /// Record a scratch path for `file_name` and return it.
    ///
    /// Reserving the same name twice returns the same path without adding a
    /// second ledger entry.
    pub fn reserve(&mut self, kind: MediaKind, file_name: &str) -> PathBuf {
        let path = self.scratch_dir.join(file_name);
        if !self.ledger.iter().any(|e| e.path == path) {
            self.ledger.push(LedgerEntry {
                path: path.clone(),
                kind,
            });
        }
        path
    }

    /// Every path recorded so far, in creation order.
    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn succeed(&mut self, output: MediaAsset) {
        self.outcome = Some(RunOutcome::Succeeded { output });
    }

    /// Record a failure at the current stage.
    pub fn fail(&mut self, error: &RedubError) {
        let stage = error.stage().unwrap_or(self.stage);
        self.outcome = Some(RunOutcome::Failed {
            stage,
            reason: error.to_string(),
        });
    }

    /// Release all scratch storage and end the run.
    ///
    /// Retry backoff sleeps the calling thread; async callers should use
    /// [`PipelineRun::finish_async`].
    pub fn finish(mut self) -> CleanupReport {
        self.release()
    }

    /// Release all scratch storage on the blocking thread pool.
    pub async fn finish_async(self) -> CleanupReport {
        let id = self.id;
        let scratch_dir = self.scratch_dir.clone();

        match tokio::task::spawn_blocking(move || self.finish()).await {
            Ok(report) => report,
            Err(e) => {
                let warning = CleanupWarning {
                    path: scratch_dir,
                    attempts: 0,
                    reason: format!("cleanup task did not complete: {}", e),
                };
                warn!("Run {}: {}", id, warning);
                CleanupReport {
                    warnings: vec![warning],
                    ..CleanupReport::default()
                }
            }
        }
    }

    fn release(&mut self) -> CleanupReport {
        if self.released {
            return CleanupReport::default();
        }
        self.released = true;
        self.stage = Stage::Cleanup;

        match &self.outcome {
            Some(RunOutcome::Succeeded { output }) => {
                info!("Run {} succeeded: {}", self.id, output.path.display())
            }
            Some(RunOutcome::Failed { stage, reason }) => {
                warn!("Run {} failed during {}: {}", self.id, stage, reason)
            }
            None => debug!("Run {} ended without an outcome", self.id),
        }

        let mut report = CleanupReport {
            outcome: self.outcome.take(),
            ..CleanupReport::default()
        };

        for entry in self.ledger.iter().rev() {
            match release_path(&entry.path, EntryKind::File, &self.policy) {
                Ok(()) => report.released.push(entry.path.clone()),
                Err(warning) => report.warnings.push(warning),
            }
        }

        let scratch = release_path(&self.scratch_dir, EntryKind::Directory, &self.policy);
        if let Err(warning) = scratch {
            report.warnings.push(warning);
        }

        info!(
            "Run {} released {} asset(s), {} warning(s)",
            self.id,
            report.released.len(),
            report.warnings.len()
        );
        report
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        if !self.released {
            warn!("Run {} ended without explicit cleanup; releasing now", self.id);
            self.release();
        }
    }
}
