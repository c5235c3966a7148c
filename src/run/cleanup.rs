//! Bounded-retry release of scratch files.

use super::RunOutcome;
use crate::config::CleanupSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// How hard to try when a scratch file cannot be removed right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Total removal attempts per asset (at least one).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl CleanupPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn immediate() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl From<&CleanupSettings> for CleanupPolicy {
    fn from(settings: &CleanupSettings) -> Self {
        Self::new(settings.max_attempts, settings.backoff())
    }
}

/// A scratch path that was still present after every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub attempts: u32,
    pub reason: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Could not delete temp file after {} attempts: {} ({})",
            self.attempts,
            self.path.display(),
            self.reason
        )
    }
}

/// Outcome of releasing a run's scratch storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// How the run ended, if it recorded an outcome before release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    /// Paths that no longer exist (removed now, or never written).
    pub released: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// What kind of filesystem entry to remove.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EntryKind {
    File,
    Directory,
}

/// Remove `path`, retrying per `policy`. A missing path counts as released.
pub(crate) fn release_path(
    path: &Path,
    kind: EntryKind,
    policy: &CleanupPolicy,
) -> std::result::Result<(), CleanupWarning> {
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        let result = match kind {
            EntryKind::File => std::fs::remove_file(path),
            EntryKind::Directory => std::fs::remove_dir_all(path),
        };

        match result {
            Ok(()) => {
                debug!("Released {}", path.display());
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                debug!(
                    "Attempt {}/{} to release {} failed: {}",
                    attempt,
                    policy.max_attempts,
                    path.display(),
                    e
                );
                last_error = Some(e);
                if attempt < policy.max_attempts && !policy.backoff.is_zero() {
                    std::thread::sleep(policy.backoff);
                }
            }
        }
    }

    let warning = CleanupWarning {
        path: path.to_path_buf(),
        attempts: policy.max_attempts,
        reason: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    };
    warn!("{}", warning);
    Err(warning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_counts_as_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-written.wav");
        assert!(release_path(&path, EntryKind::File, &CleanupPolicy::immediate()).is_ok());
    }

    #[test]
    fn test_existing_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        release_path(&path, EntryKind::File, &CleanupPolicy::immediate()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_exhausted_retries_produce_warning() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where a file is expected cannot be removed with remove_file.
        let path = dir.path().join("stuck.wav");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("inner"), b"x").unwrap();

        let policy = CleanupPolicy::new(3, Duration::ZERO);
        let warning = release_path(&path, EntryKind::File, &policy).unwrap_err();

        assert_eq!(warning.attempts, 3);
        assert_eq!(warning.path, path);
        assert!(path.exists());
        assert!(warning.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(CleanupPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = CleanupPolicy::from(&CleanupSettings::default());
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }
}
