//! Redub CLI entry point.

use anyhow::Result;
use clap::Parser;
use redub::cli::{commands, Cli, Commands};
use redub::config::{Credentials, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = match &config_path {
        Some(path) => Settings::load_from(Some(path))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = settings.general.effective_log_level(cli.verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("redub={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let credentials = Credentials::from_env();

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, &credentials)?;
        }

        Commands::Process {
            input,
            output,
            json,
        } => {
            std::fs::create_dir_all(settings.temp_dir())?;
            commands::run_process(input, output.clone(), *json, settings, &credentials).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
