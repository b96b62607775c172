//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// WordCount - distributed word counter
#[derive(Parser)]
#[command(
    name = "wordcount",
    about = "Distributed word counter coordinated through a shared document store",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Source text file to count
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Coordination store database file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Worker pollers to start when running as a worker
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Override config file values with the ones given on the command line
    pub fn apply_overrides(&self, config: &mut Config) {
        debug!("apply_overrides: called");
        if let Some(source) = &self.source {
            config.source = Some(source.clone());
        }
        if let Some(store) = &self.store {
            config.store.path = store.clone();
        }
        if let Some(workers) = self.workers {
            config.worker.tasks = workers;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the run: become controller if none is active, otherwise a worker (default)
    Run,

    /// Print final word counts of a finished run
    Results {
        /// Only words under this one- or two-letter prefix
        prefix: Option<String>,

        /// Only the N most frequent words
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show process, controller, worker and job progress
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for results/status commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}
