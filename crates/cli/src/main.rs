//! APICURON action command-line entry point.
//!
//! Reads the push event the CI runner hands over, credits each commit
//! author with an ORCID on APICURON, and exits non-zero when the run fails.
//! Also provides `init` / `validate` helpers for TOML configuration files.

mod outputs;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use apicuron_core::config::ActionConfig;
use apicuron_core::pipeline::{ReportPipeline, SubmitMode};
use apicuron_core::PushEvent;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Credit pushed commits on APICURON.
#[derive(Parser, Debug)]
#[command(
    name = "apicuron-action",
    version,
    about = "Turn CI push events into APICURON attribution reports"
)]
struct Cli {
    /// Path to a TOML configuration file. Action inputs (`INPUT_*`) are
    /// used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble reports for a push event and submit them.
    Run {
        /// Push event JSON. Defaults to `$GITHUB_EVENT_PATH`.
        #[arg(short, long)]
        event: Option<PathBuf>,

        /// Also write the assembled reports as JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Assemble reports without submitting them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./apicuron.toml")]
        output: PathBuf,
    },

    /// Validate the configuration.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // `run` needs its configuration before tracing starts, so that the
    // configured level can take effect.
    let config = match &cli.command {
        Commands::Run { .. } => match load_config(cli.config.as_deref()) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::FAILURE;
            }
        },
        _ => None,
    };

    let runner_debug = std::env::var("RUNNER_DEBUG").ok();
    let level = effective_level(
        cli.log_level.as_deref(),
        runner_debug.as_deref(),
        config.as_ref().map(|c| c.logging.level.as_str()),
    );
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log level precedence: `--log-level`, then `debug` when the runner has
/// step debugging on, then the configured level, then `info`.
fn effective_level(
    cli_level: Option<&str>,
    runner_debug: Option<&str>,
    configured: Option<&str>,
) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }
    if runner_debug == Some("1") {
        return "debug".into();
    }
    configured
        .filter(|l| !l.trim().is_empty())
        .unwrap_or("info")
        .to_string()
}

async fn run(cli: Cli, config: Option<ActionConfig>) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(cli.config.as_deref()),
        Commands::Run {
            event,
            output,
            dry_run,
        } => {
            let config = match config {
                Some(config) => config,
                None => load_config(cli.config.as_deref())?,
            };
            let mode = if dry_run {
                SubmitMode::DryRun
            } else {
                SubmitMode::Submit
            };
            cmd_run(&config, event, output.as_deref(), mode).await
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<ActionConfig> {
    let config = match path {
        Some(path) => ActionConfig::load_and_resolve(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            let config =
                ActionConfig::from_action_env().context("failed to read action inputs")?;
            config.validate().context("invalid action inputs")?;
            config
        }
    };
    Ok(config)
}

fn event_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => std::env::var_os("GITHUB_EVENT_PATH")
            .map(PathBuf::from)
            .context("no --event given and GITHUB_EVENT_PATH is not set"),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &ActionConfig,
    event: Option<PathBuf>,
    output: Option<&Path>,
    mode: SubmitMode,
) -> Result<()> {
    let event_path = event_path(event)?;
    let event = PushEvent::load_from_file(&event_path).context("failed to load push event")?;

    let pipeline = ReportPipeline::from_config(config).context("failed to set up pipeline")?;
    let summary = pipeline
        .run(&event, &config.report, mode)
        .await
        .context("failed to report commits to APICURON")?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&summary.reports)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write reports to {}", path.display()))?;
        info!(path = %path.display(), "reports written");
    }

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
        if let Err(e) = outputs::append_github_output(Path::new(&path), &summary) {
            warn!(error = %e, "failed to write step outputs");
        }
    }

    println!(
        "{} report(s) assembled, {}",
        summary.reports.len(),
        if summary.submitted {
            "submitted to APICURON"
        } else {
            "nothing submitted"
        }
    );
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# APICURON action configuration
# Secrets are read from the environment variables named by `*_env`.

[orcid]
endpoint = "https://users.example.org/api/orcid"
token_env = "ORCID_API_TOKEN"

[apicuron]
endpoint = "https://apicuron.org/api/reports/bulk"
token_env = "APICURON_TOKEN"

[report]
activity_term = "commit"
league = "default"
# resource_id = "owner-repo"
# resource_url = "https://example.org/resources"

# [identity]
# mapping_file = "orcids.toml"

[logging]
level = "info"
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the endpoints and report settings");
    println!("  2. Set ORCID_API_TOKEN and APICURON_TOKEN");
    println!(
        "  3. Validate with: apicuron-action --config {} validate",
        output.display()
    );

    Ok(())
}

fn cmd_validate(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => {
            println!("Validating configuration: {}", path.display());
            let mut config =
                ActionConfig::load_from_file(path).context("failed to parse configuration")?;
            println!("  [OK] TOML structure is valid");
            config
                .resolve_env_vars()
                .context("failed to resolve environment variables")?;
            println!("  [OK] Environment variable references processed");
            config
        }
        None => {
            println!("Validating action inputs");
            let config = ActionConfig::from_action_env().context("failed to read action inputs")?;
            println!("  [OK] Required inputs are present");
            config
        }
    };

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    match (&config.identity.mapping_file, &config.orcid) {
        (Some(file), _) => println!("  ORCID source  : {}", file.display()),
        (None, Some(orcid)) => println!("  ORCID source  : {}", orcid.endpoint),
        (None, None) => println!("  ORCID source  : NOT SET"),
    }
    println!("  APICURON      : {}", config.apicuron.endpoint);
    println!("  Activity term : {}", config.report.activity_term);
    println!("  League        : {}", config.report.league);
    println!(
        "  Resource id   : {}",
        config
            .report
            .resource_id
            .as_deref()
            .unwrap_or("<owner>-<repo>")
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flag_wins() {
        assert_eq!(effective_level(Some("trace"), Some("1"), Some("warn")), "trace");
    }

    #[test]
    fn test_runner_debug_beats_configured_level() {
        assert_eq!(effective_level(None, Some("1"), Some("warn")), "debug");
        assert_eq!(effective_level(None, Some("0"), Some("warn")), "warn");
    }

    #[test]
    fn test_configured_level_is_used() {
        assert_eq!(effective_level(None, None, Some("debug")), "debug");
    }

    #[test]
    fn test_level_defaults_to_info() {
        assert_eq!(effective_level(None, None, None), "info");
        assert_eq!(effective_level(None, None, Some("  ")), "info");
    }
}
