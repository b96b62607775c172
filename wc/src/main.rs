//! WordCount - distributed word counter
//!
//! CLI entry point: join a run, or inspect one.

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use docstore::SqliteStore;
use wordcount::cli::{Cli, Command, OutputFormat};
use wordcount::config::Config;
use wordcount::report::{render_status, render_words, top_words};
use wordcount::role::{self, LaunchOutcome};
use wordcount::state::StateManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install log subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    setup_logging(cli.log_level.as_deref(), Some(config.log_level.as_str())).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Run) => cmd_run(&config).await,
        Some(Command::Results { prefix, top, format }) => cmd_results(&config, prefix.as_deref(), top, format).await,
        Some(Command::Status { format }) => cmd_status(&config, format).await,
    }
}

/// Join the run as controller or worker
async fn cmd_run(config: &Config) -> Result<()> {
    debug!("cmd_run: called");
    match role::launch(config).await? {
        LaunchOutcome::Controller(summary) => {
            println!(
                "{} Counted {} lines in {} text jobs, merged into {} prefixes",
                "✓".green(),
                summary.total_lines,
                summary.text_jobs,
                summary.amalgamation_jobs
            );
        }
        LaunchOutcome::Workers(summaries) => {
            let text_jobs: u64 = summaries.iter().map(|s| s.text_jobs).sum();
            let amalgamation_jobs: u64 = summaries.iter().map(|s| s.amalgamation_jobs).sum();
            info!(workers = summaries.len(), text_jobs, amalgamation_jobs, "Workers finished");
            println!(
                "{} {} workers ran {} text jobs and {} amalgamation jobs",
                "✓".green(),
                summaries.len(),
                text_jobs,
                amalgamation_jobs
            );
        }
    }
    Ok(())
}

/// Open an existing store for inspection
fn open_existing_store(config: &Config) -> Result<StateManager> {
    let path = &config.store.path;
    if !path.exists() {
        return Err(eyre::eyre!("No store found at {}. Has a run started?", path.display()));
    }
    let store = SqliteStore::open(path).context(format!("Failed to open store {}", path.display()))?;
    Ok(StateManager::spawn(store))
}

/// Print final word counts
async fn cmd_results(config: &Config, prefix: Option<&str>, top: Option<usize>, format: OutputFormat) -> Result<()> {
    debug!(?prefix, ?top, ?format, "cmd_results: called");
    let state = open_existing_store(config)?;
    let prefix = prefix.map(str::to_lowercase);
    let records = state.final_word_counts(prefix.as_deref()).await?;
    let words = top_words(&records, top);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&words)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No final word counts yet");
            } else {
                print!("{}", render_words(&words));
            }
        }
    }

    state.shutdown().await?;
    Ok(())
}

/// Print run progress
async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let state = open_existing_store(config)?;
    let progress = state.progress().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&progress)?),
        OutputFormat::Text => {
            let controller = state.controller().await?;
            print!("{}", render_status(&progress, controller.as_ref()));
        }
    }

    state.shutdown().await?;
    Ok(())
}
