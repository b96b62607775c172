//! Role selection and startup
//!
//! The first process to find no active controller becomes the controller
//! and wipes the store; every later process becomes a worker process that
//! runs several worker pollers.

use std::path::PathBuf;

use docstore::SqliteStore;
use eyre::{Context, Result};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::{Config, WorkerConfig};
use crate::controller::{Controller, RunSummary};
use crate::state::StateManager;
use crate::worker::{Worker, WorkerError, WorkerSummary};

/// The role a process took on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Controller,
    Worker,
}

/// What a launched process did
#[derive(Debug)]
pub enum LaunchOutcome {
    Controller(RunSummary),
    Workers(Vec<WorkerSummary>),
}

/// Open the configured store and take part in the run
pub async fn launch(config: &Config) -> Result<LaunchOutcome> {
    debug!(store = %config.store.path.display(), "launch: called");
    config.validate()?;

    let store = SqliteStore::open(&config.store.path)
        .context(format!("Failed to open store {}", config.store.path.display()))?;
    let state = StateManager::spawn(store);

    let outcome = launch_with(&state, config).await;
    state.shutdown().await?;
    outcome
}

/// Take part in the run through an already running state actor
pub async fn launch_with(state: &StateManager, config: &Config) -> Result<LaunchOutcome> {
    let source = config
        .source
        .clone()
        .ok_or_else(|| eyre::eyre!("No source file configured"))?;

    match decide_role(state).await? {
        Role::Controller => {
            info!("No active controller found, running as controller");
            let controller = Controller::new(state.clone(), source, config.controller.clone());
            let summary = controller.run().await.context("Controller failed")?;
            Ok(LaunchOutcome::Controller(summary))
        }
        Role::Worker => {
            info!(tasks = config.worker.tasks, "Controller active, running as worker");
            let summaries = run_workers(state, source, &config.worker)
                .await
                .context("Worker failed")?;
            Ok(LaunchOutcome::Workers(summaries))
        }
    }
}

pub async fn decide_role(state: &StateManager) -> Result<Role> {
    if state.is_controller_active().await? {
        Ok(Role::Worker)
    } else {
        Ok(Role::Controller)
    }
}

/// Register `config.tasks` workers and run them until the run ends
///
/// Each worker runs on its own task. The first worker error is returned
/// once every worker has stopped.
pub async fn run_workers(
    state: &StateManager,
    source: PathBuf,
    config: &WorkerConfig,
) -> Result<Vec<WorkerSummary>, WorkerError> {
    debug!(tasks = config.tasks, "run_workers: called");
    let mut workers = Vec::with_capacity(config.tasks);
    for _ in 0..config.tasks {
        workers.push(Worker::register(state.clone(), source.clone(), config.poll()).await?);
    }

    let handles = workers.into_iter().map(|worker| tokio::spawn(worker.run()));
    try_join_all(handles).await?.into_iter().collect()
}
