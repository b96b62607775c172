//! Controller - owns one run from election to completion
//!
//! Phase A hands text jobs to available workers until every line is carved
//! and every text job is complete. Phase B creates the prefix jobs and hands
//! them out until every one is complete.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::ControllerConfig;
use crate::domain::{ControllerStatus, JobType, ProcessStatus};
use crate::state::{StateError, StateManager};

use super::line_counter;
use super::partitioner::{PartitionError, Partitioner};
use super::run_state::RunState;

/// Errors that end a run
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("Coordination store failure: {0}")]
    State(#[from] StateError),
}

/// What a completed run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub controller_id: String,
    pub total_lines: u64,
    pub text_jobs: u64,
    pub amalgamation_jobs: u64,
}

/// Where a scheduling pass gets fresh jobs from
trait JobSource {
    const JOB_TYPE: JobType;

    /// Identity of the next job, `None` when nothing more is available
    async fn next_job(&mut self) -> Result<Option<String>, ControllerError>;
}

/// Carves ranges and records them as text jobs
struct TextJobs<'a> {
    state: &'a StateManager,
    partitioner: Partitioner,
    created: u64,
}

impl JobSource for TextJobs<'_> {
    const JOB_TYPE: JobType = JobType::TextProcessing;

    async fn next_job(&mut self) -> Result<Option<String>, ControllerError> {
        let Some(range) = self.partitioner.next_range().await? else {
            return Ok(None);
        };
        let job_id = self.state.create_text_job(range).await?;
        self.created += 1;
        info!(%job_id, first_line = range.first_line, last_line = range.last_line, "Created text job");
        Ok(Some(job_id))
    }
}

/// Claims unassigned prefix jobs
struct AmalgamationJobs<'a> {
    state: &'a StateManager,
}

impl JobSource for AmalgamationJobs<'_> {
    const JOB_TYPE: JobType = JobType::Amalgamation;

    async fn next_job(&mut self) -> Result<Option<String>, ControllerError> {
        Ok(self.state.claim_next_amalgamation_job().await?)
    }
}

/// The elected controller of a run
pub struct Controller {
    state: StateManager,
    source: PathBuf,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(state: StateManager, source: impl Into<PathBuf>, config: ControllerConfig) -> Self {
        Self {
            state,
            source: source.into(),
            config,
        }
    }

    /// Reset the store, register, and drive both phases to completion
    ///
    /// On failure the process is marked `error` and the controller
    /// `finished` before the error is returned, so workers stop polling.
    pub async fn run(&self) -> Result<RunSummary, ControllerError> {
        debug!(source = %self.source.display(), "run: called");
        self.state.clear_all_collections().await?;
        let controller_id = self.state.register_controller().await?;

        let span = info_span!("controller", node_id = %controller_id);
        self.run_as(&controller_id).instrument(span).await
    }

    async fn run_as(&self, controller_id: &str) -> Result<RunSummary, ControllerError> {
        match self.schedule(controller_id).await {
            Ok(summary) => {
                self.state.set_process_status(ProcessStatus::Complete).await?;
                self.state
                    .set_controller_status(controller_id, ControllerStatus::Finished)
                    .await?;
                info!(
                    total_lines = summary.total_lines,
                    text_jobs = summary.text_jobs,
                    amalgamation_jobs = summary.amalgamation_jobs,
                    "Work finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                self.abandon(controller_id).await;
                Err(e)
            }
        }
    }

    /// Best-effort marking of a failed run
    async fn abandon(&self, controller_id: &str) {
        if let Err(e) = self.state.set_process_status(ProcessStatus::Error).await {
            warn!(error = %e, "Unable to mark process as failed");
        }
        if let Err(e) = self
            .state
            .set_controller_status(controller_id, ControllerStatus::Finished)
            .await
        {
            warn!(error = %e, "Unable to mark controller as finished");
        }
    }

    async fn schedule(&self, controller_id: &str) -> Result<RunSummary, ControllerError> {
        self.state.start_process().await?;
        info!(
            source = %self.source.display(),
            job_size = self.config.job_size,
            "Running as controller, awaiting available workers"
        );

        let run_state = Arc::new(RunState::new());
        let counter = line_counter::spawn(self.source.clone(), run_state.clone());

        let result = self.run_phases(controller_id, &run_state).await;
        counter.abort();
        result
    }

    async fn run_phases(&self, controller_id: &str, run_state: &Arc<RunState>) -> Result<RunSummary, ControllerError> {
        let text_jobs = self.text_phase(run_state).await?;
        let amalgamation_jobs = self.amalgamation_phase().await?;
        Ok(RunSummary {
            controller_id: controller_id.to_string(),
            total_lines: run_state.total_lines(),
            text_jobs,
            amalgamation_jobs,
        })
    }

    async fn text_phase(&self, run_state: &Arc<RunState>) -> Result<u64, ControllerError> {
        info!("Beginning text processing phase");
        let mut jobs = TextJobs {
            state: &self.state,
            partitioner: Partitioner::new(run_state.clone(), self.config.job_size, self.config.line_wait()),
            created: 0,
        };
        let mut backlog = VecDeque::new();

        loop {
            if run_state.is_count_error() {
                return Err(PartitionError::LineCountFailed.into());
            }

            self.schedule_pass(&mut jobs, &mut backlog).await?;

            if backlog.is_empty() && run_state.all_lines_carved() && self.state.all_text_jobs_complete().await? {
                break;
            }
            tokio::time::sleep(self.config.text_poll()).await;
        }

        info!(text_jobs = jobs.created, total_lines = run_state.total_lines(), "Text processing phase complete");
        Ok(jobs.created)
    }

    async fn amalgamation_phase(&self) -> Result<u64, ControllerError> {
        info!("Creating amalgamation jobs");
        let created = self.state.create_amalgamation_jobs().await? as u64;

        info!(amalgamation_jobs = created, "Beginning amalgamation phase");
        let mut jobs = AmalgamationJobs { state: &self.state };
        let mut backlog = VecDeque::new();

        loop {
            self.schedule_pass(&mut jobs, &mut backlog).await?;

            if backlog.is_empty() && self.state.all_amalgamation_jobs_complete().await? {
                break;
            }
            tokio::time::sleep(self.config.amalgamation_poll()).await;
        }

        info!("Amalgamation phase complete");
        Ok(created)
    }

    /// Offer one job to every worker that is `new` or `idle`
    ///
    /// Jobs whose assignment lost a race with the worker's own status change
    /// go to the front of `backlog` and are offered before any fresh job.
    async fn schedule_pass<J: JobSource>(
        &self,
        jobs: &mut J,
        backlog: &mut VecDeque<String>,
    ) -> Result<(), ControllerError> {
        for worker in self.state.list_workers().await? {
            if !worker.status.is_available() {
                continue;
            }

            let job_id = match backlog.pop_front() {
                Some(job_id) => job_id,
                None => match jobs.next_job().await? {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            if self.state.assign_job_to_worker(&worker.id, &job_id, J::JOB_TYPE).await? {
                info!(%job_id, worker_id = %worker.id, job_type = %J::JOB_TYPE, "Assigned job to worker");
            } else {
                warn!(%job_id, worker_id = %worker.id, "Worker no longer available, job kept for the next worker");
                backlog.push_front(job_id);
            }
        }
        Ok(())
    }
}
