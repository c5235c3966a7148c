//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{
    CorrectionProvider, Credentials, Settings, SynthesisProvider, TranscriptionProvider,
    AZURE_API_KEY, AZURE_API_URL, GOOGLE_API_KEY, OPENAI_API_KEY,
};
use crate::openai::AzureEndpoint;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, credentials: &Credentials) -> anyhow::Result<()> {
    Output::header("Redub Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    checks.extend(print_all(vec![
        check_tool("ffmpeg", install_hint_ffmpeg()),
        check_tool("ffprobe", install_hint_ffmpeg()),
    ]));
    println!();

    println!("{}", style("Services").bold());
    checks.extend(print_all(check_services(settings, credentials)));
    println!();

    println!("{}", style("Directories").bold());
    checks.extend(print_all(vec![check_temp_dir(settings)]));
    println!();

    println!("{}", style("Configuration").bold());
    checks.extend(print_all(vec![check_config_file()]));
    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Redub.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Redub is ready to use.");
    }

    Ok(())
}

fn print_all(checks: Vec<CheckResult>) -> Vec<CheckResult> {
    for check in &checks {
        check.print();
    }
    checks
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// One check per configured provider.
fn check_services(settings: &Settings, credentials: &Credentials) -> Vec<CheckResult> {
    let google = &credentials.google_api_key;
    let openai = &credentials.openai_api_key;

    let transcription = match settings.transcription.provider {
        TranscriptionProvider::Google => {
            check_key("Transcription (google)", GOOGLE_API_KEY, google)
        }
        TranscriptionProvider::Whisper => {
            check_key("Transcription (whisper)", OPENAI_API_KEY, openai)
        }
    };

    let correction = match settings.correction.provider {
        CorrectionProvider::OpenAI => check_key("Correction (openai)", OPENAI_API_KEY, openai),
        CorrectionProvider::Azure => check_azure(settings, credentials),
    };

    let synthesis = match settings.synthesis.provider {
        SynthesisProvider::Google => check_key("Synthesis (google)", GOOGLE_API_KEY, google),
        SynthesisProvider::OpenAI => check_key("Synthesis (openai)", OPENAI_API_KEY, openai),
    };

    vec![transcription, correction, synthesis]
}

fn check_key(name: &str, var: &str, value: &Option<String>) -> CheckResult {
    match value {
        Some(key) => CheckResult::ok(name, &format!("{} configured ({})", var, mask(key))),
        None => CheckResult::error(
            name,
            &format!("{} not set", var),
            &format!("Set with: export {}='...'", var),
        ),
    }
}

fn check_azure(settings: &Settings, credentials: &Credentials) -> CheckResult {
    let name = "Correction (azure)";
    let (Some(_), Some(url)) = (&credentials.azure_api_key, &credentials.azure_api_url) else {
        return CheckResult::error(
            name,
            &format!("{} and {} are required", AZURE_API_KEY, AZURE_API_URL),
            "Set both to your Azure OpenAI key and chat completions URL",
        );
    };

    match AzureEndpoint::parse(
        url,
        settings.correction.azure_deployment.as_deref(),
        &settings.correction.azure_api_version,
    ) {
        Ok(endpoint) => CheckResult::ok(
            name,
            &format!("deployment {} at {}", endpoint.deployment, endpoint.api_base),
        ),
        Err(e) => CheckResult::error(name, &e.to_string(), "Check AZURE_API_URL"),
    }
}

/// `sk-proj...abcd` style masking that never reveals short keys.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if !temp_dir.exists() {
        return CheckResult::warning(
            "Scratch directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first run",
        );
    }

    let leftovers = std::fs::read_dir(&temp_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("run-"))
                .count()
        })
        .unwrap_or(0);

    if leftovers > 0 {
        CheckResult::warning(
            "Scratch directory",
            &format!("{} ({} leftover run(s))", temp_dir.display(), leftovers),
            "Leftovers come from interrupted runs and are safe to delete",
        )
    } else {
        CheckResult::ok("Scratch directory", &format!("{}", temp_dir.display()))
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: redub config edit",
        )
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("sk-proj-1234567890abcd"), "sk-p...abcd");
    }

    #[test]
    fn test_services_follow_providers() {
        let mut vars = HashMap::new();
        vars.insert(GOOGLE_API_KEY.to_string(), "AIzaSyExampleKey1234".to_string());
        let creds = Credentials::from_map(&vars);

        let checks = check_services(&Settings::default(), &creds);
        let statuses: Vec<_> = checks.iter().map(|c| &c.status).collect();
        assert_eq!(
            statuses,
            vec![&CheckStatus::Ok, &CheckStatus::Error, &CheckStatus::Ok]
        );
    }

    #[test]
    fn test_azure_check_reports_deployment() {
        let mut settings = Settings::default();
        settings.correction.provider = CorrectionProvider::Azure;
        let mut vars = HashMap::new();
        vars.insert(AZURE_API_KEY.to_string(), "azure-key".to_string());
        vars.insert(
            AZURE_API_URL.to_string(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions".to_string(),
        );

        let check = check_azure(&settings, &Credentials::from_map(&vars));
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(check.message.contains("gpt-4o"));
    }
}
