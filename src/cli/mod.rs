//! CLI module for Redub.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Redub - re-voice the speech in short videos
///
/// Transcribes a video's speech, corrects the grammar, synthesizes it again
/// and lays the new voice back over the picture at the original length.
#[derive(Parser, Debug)]
#[command(name = "redub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Replace the speech track of a video
    Process {
        /// Video file (mp4, mov, avi, webm, mkv, m4v)
        input: String,

        /// Output file or directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from(["redub", "-v", "process", "clip.mov", "-o", "out/", "--json"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Process { input, output, json } => {
                assert_eq!(input, "clip.mov");
                assert_eq!(output.as_deref(), Some("out/"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::parse_from(["redub", "config", "path"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
