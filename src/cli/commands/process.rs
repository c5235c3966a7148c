//! Process command implementation.

use crate::cli::output::format_seconds;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::ingest::Upload;
use crate::orchestrator::{Orchestrator, ProcessReport};
use crate::reconcile::ReconcileAction;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the process command.
pub async fn run_process(
    input: &str,
    output: Option<String>,
    json: bool,
    settings: Settings,
    credentials: &Credentials,
) -> Result<()> {
    if let Err(e) = preflight::check_process(&settings, credentials) {
        Output::error(&format!("{}", e));
        Output::info("Run 'redub doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let input_path = Settings::expand_path(input);
    let destination = match output {
        Some(path) => Settings::expand_path(&path),
        None => std::env::current_dir().context("Could not determine the current directory")?,
    };

    let upload = Upload::from_path(&input_path)
        .await
        .with_context(|| format!("Could not read {}", input_path.display()))?;

    let orchestrator = Orchestrator::new(settings, credentials)?;

    if !json {
        Output::info(&format!("Processing: {}", input_path.display()));
    }
    let report = run_with_spinner(&orchestrator, &upload, &destination, json).await;

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn run_with_spinner(
    orchestrator: &Orchestrator,
    upload: &Upload,
    destination: &Path,
    quiet: bool,
) -> crate::error::Result<ProcessReport> {
    if quiet {
        return orchestrator.process_video(upload, destination).await;
    }

    let spinner = Output::spinner("Starting...");
    let result = orchestrator
        .process_video_with_progress(upload, destination, &|stage| {
            spinner.set_message(format!("Running {}...", stage));
        })
        .await;
    spinner.finish_and_clear();
    result
}

fn print_report(report: &ProcessReport) {
    Output::header("Transcript");
    Output::transcript("raw", &report.raw_transcript.text);
    Output::transcript("corrected", &report.corrected_transcript.text);

    Output::header("Timing");
    Output::kv("Video", &format_seconds(report.video_duration));
    Output::kv("Synthesized speech", &format_seconds(report.synthesized_duration));

    let action = match &report.reconciliation.action {
        ReconcileAction::PassThrough => "within tolerance, unchanged".to_string(),
        ReconcileAction::Stretched { factor } => format!("time-stretched x{:.3}", factor),
        ReconcileAction::Skipped { reason } => format!("not stretched ({})", reason),
        ReconcileAction::FellBack { reason } => format!("stretch failed ({})", reason),
    };
    Output::kv("Reconciliation", &action);
    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    Output::kv("Processing time", &format_seconds(elapsed));

    if let Some(divergence) = &report.reconciliation.divergence {
        Output::warning(&format!(
            "Speech is {:+.2}s off the picture; the remux pads or cuts it to fit.",
            divergence.seconds()
        ));
    }

    for warning in &report.cleanup.warnings {
        Output::warning(&warning.to_string());
    }

    println!();
    Output::success(&format!(
        "Wrote {} ({})",
        display_path(&report.output.path).display(),
        report.output.mime_type
    ));
}

/// Show paths relative to the working directory when possible.
fn display_path(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}
