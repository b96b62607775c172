//! WordCount configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main WordCount configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text file to count, required to run
    pub source: Option<PathBuf>,
    /// Log level when none is given on the command line
    #[serde(rename = "log-level")]
    pub log_level: String,
    /// Coordination store configuration
    pub store: StoreConfig,
    /// Controller scheduling configuration
    pub controller: ControllerConfig,
    /// Worker configuration
    pub worker: WorkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            log_level: "info".to_string(),
            store: StoreConfig::default(),
            controller: ControllerConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration before a run
    ///
    /// Fails fast on anything that would only surface once role work began.
    pub fn validate(&self) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| eyre::eyre!("No source file configured. Pass --source or set `source` in the config."))?;
        if !source.is_file() {
            return Err(eyre::eyre!("Source file not found: {}", source.display()));
        }
        if self.controller.job_size == 0 {
            return Err(eyre::eyre!("controller.job-size must be greater than zero"));
        }
        if self.worker.tasks == 0 {
            return Err(eyre::eyre!("worker.tasks must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .wordcount.yml
        let local_config = PathBuf::from(".wordcount.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/wordcount/wordcount.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wordcount").join("wordcount.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Coordination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file shared by every process of a run
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wordcount.db"),
        }
    }
}

/// Controller scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Lines per text job
    #[serde(rename = "job-size")]
    pub job_size: u64,
    /// Scheduling pass interval while counting words
    #[serde(rename = "text-poll-ms")]
    pub text_poll_ms: u64,
    /// Scheduling pass interval while amalgamating
    #[serde(rename = "amalgamation-poll-ms")]
    pub amalgamation_poll_ms: u64,
    /// Poll interval while waiting for enough counted lines
    #[serde(rename = "line-wait-ms")]
    pub line_wait_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            job_size: 2_000_000,
            text_poll_ms: 2000,
            amalgamation_poll_ms: 500,
            line_wait_ms: 1500,
        }
    }
}

impl ControllerConfig {
    pub fn text_poll(&self) -> Duration {
        Duration::from_millis(self.text_poll_ms)
    }

    pub fn amalgamation_poll(&self) -> Duration {
        Duration::from_millis(self.amalgamation_poll_ms)
    }

    pub fn line_wait(&self) -> Duration {
        Duration::from_millis(self.line_wait_ms)
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker pollers started by one worker process
    pub tasks: usize,
    /// Interval between polls of the worker's own record
    #[serde(rename = "poll-ms")]
    pub poll_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { tasks: 3, poll_ms: 1000 }
    }
}

impl WorkerConfig {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
