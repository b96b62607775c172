//! Worker - polls its own record and executes assigned jobs
//!
//! State machine: `new -> idle <-> job_pending -> working -> idle`. A worker
//! found `timed_out` re-registers under a fresh identity. The loop ends once
//! the run's process status is no longer `active`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::domain::{JobType, ProcessStatus, WorkerRecord, WorkerStatus};
use crate::source::{SourceError, SourceReader};
use crate::state::{StateError, StateManager};

use super::executor::{amalgamate, count_range};

/// Errors that stop a worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Unrecognised job type <{0}>")]
    UnrecognisedJobType(String),

    #[error("Worker {0} has a pending job but no job id")]
    MissingAssignment(String),

    #[error("Worker record {0} not found")]
    MissingRecord(String),

    #[error("Text job {0} not found")]
    MissingJob(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Coordination store failure: {0}")]
    State(#[from] StateError),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Jobs one worker executed before the run ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub worker_id: String,
    pub text_jobs: u64,
    pub amalgamation_jobs: u64,
}

/// One worker poller
pub struct Worker {
    state: StateManager,
    source: PathBuf,
    poll: Duration,
    id: String,
    /// Opened on the first text job and kept across jobs
    reader: Option<SourceReader>,
    summary: WorkerSummary,
}

impl Worker {
    /// Register a new worker in state `new`
    pub async fn register(state: StateManager, source: impl Into<PathBuf>, poll: Duration) -> Result<Self, WorkerError> {
        let id = state.register_worker().await?;
        debug!(worker_id = %id, "register: registered");
        Ok(Self {
            state,
            source: source.into(),
            poll,
            summary: WorkerSummary {
                worker_id: id.clone(),
                ..Default::default()
            },
            id,
            reader: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Poll until the run ends
    pub async fn run(self) -> Result<WorkerSummary, WorkerError> {
        let span = info_span!("worker", node_id = %self.id);
        self.poll_loop().instrument(span).await
    }

    async fn poll_loop(mut self) -> Result<WorkerSummary, WorkerError> {
        info!(source = %self.source.display(), "New worker node");
        while self.process_running().await? {
            self.poll_once().await?;
            tokio::time::sleep(self.poll).await;
        }

        self.reader = None;
        self.summary.worker_id = self.id.clone();
        info!(
            text_jobs = self.summary.text_jobs,
            amalgamation_jobs = self.summary.amalgamation_jobs,
            "Process complete, exiting"
        );
        Ok(self.summary)
    }

    /// Whether the run is still going
    ///
    /// A run the controller has not started yet counts as going.
    async fn process_running(&self) -> Result<bool, WorkerError> {
        match self.state.process_status().await? {
            None | Some(ProcessStatus::Active) => Ok(true),
            Some(status) => {
                debug!(%status, "process_running: run ended");
                Ok(false)
            }
        }
    }

    /// One iteration of the worker state machine
    async fn poll_once(&mut self) -> Result<(), WorkerError> {
        let record = self
            .state
            .get_worker(&self.id)
            .await?
            .ok_or_else(|| WorkerError::MissingRecord(self.id.clone()))?;

        match record.status {
            WorkerStatus::JobPending => {
                self.state.update_worker_status(&self.id, WorkerStatus::Working).await?;
                self.execute(&record).await?;
                self.state.update_worker_status(&self.id, WorkerStatus::Idle).await?;
            }
            WorkerStatus::TimedOut => {
                let new_id = self.state.register_worker().await?;
                warn!(previous_id = %self.id, %new_id, "Worker timed out, re-registered");
                Span::current().record("node_id", new_id.as_str());
                self.id = new_id;
            }
            WorkerStatus::New | WorkerStatus::Idle | WorkerStatus::Working => {}
        }
        Ok(())
    }

    async fn execute(&mut self, record: &WorkerRecord) -> Result<(), WorkerError> {
        let raw_type = record.job_type.as_deref().unwrap_or_default();
        let job_type: JobType = raw_type
            .parse()
            .map_err(|_| WorkerError::UnrecognisedJobType(raw_type.to_string()))?;
        let job_id = record
            .job_id
            .as_deref()
            .ok_or_else(|| WorkerError::MissingAssignment(self.id.clone()))?;

        match job_type {
            JobType::TextProcessing => {
                self.process_text_job(job_id).await?;
                self.summary.text_jobs += 1;
            }
            JobType::Amalgamation => {
                let totals = amalgamate(&self.state, job_id).await?;
                debug!(prefix = %job_id, words = totals.len(), "Completed amalgamation job");
                self.summary.amalgamation_jobs += 1;
            }
        }
        Ok(())
    }

    async fn process_text_job(&mut self, job_id: &str) -> Result<(), WorkerError> {
        let job = self
            .state
            .get_text_job(job_id)
            .await?
            .ok_or_else(|| WorkerError::MissingJob(job_id.to_string()))?;
        let range = job.range();
        info!(%job_id, first_line = range.first_line, last_line = range.last_line, "Beginning text processing job");

        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => {
                debug!(source = %self.source.display(), "process_text_job: opening reader");
                SourceReader::open(&self.source).await?
            }
        };
        let reader = self.reader.insert(reader);

        let counts = count_range(reader, range).await?;
        self.state.complete_text_job(job_id, &counts).await?;
        info!(%job_id, words = counts.len(), "Completed text processing job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineRange, Record};
    use docstore::{MemoryStore, Update};
    use std::io::Write;

    const POLL: Duration = Duration::from_millis(5);

    fn source(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_executes_text_job_and_returns_to_idle() {
        let file = source("The cat sat.\nThe dog sat.\n");
        let state = StateManager::spawn(MemoryStore::new());
        state.start_process().await.unwrap();

        let mut worker = Worker::register(state.clone(), file.path(), POLL).await.unwrap();
        let job_id = state.create_text_job(LineRange::new(1, 2)).await.unwrap();
        assert!(state.assign_job_to_worker(worker.id(), &job_id, JobType::TextProcessing).await.unwrap());

        worker.poll_once().await.unwrap();

        let record = state.get_worker(worker.id()).await.unwrap().unwrap();
        assert_eq!(record.status, WorkerStatus::Idle);
        assert!(state.all_text_jobs_complete().await.unwrap());
        assert_eq!(state.shard_results_for_prefix("sa").await.unwrap()[0].word_counts.get("sat"), Some(&2));
        assert_eq!(worker.summary.text_jobs, 1);
    }

    #[tokio::test]
    async fn test_idle_worker_does_nothing() {
        let state = StateManager::spawn(MemoryStore::new());
        let mut worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();

        worker.poll_once().await.unwrap();

        let record = state.get_worker(worker.id()).await.unwrap().unwrap();
        assert_eq!(record.status, WorkerStatus::New);
    }

    #[tokio::test]
    async fn test_unrecognised_job_type_is_fatal() {
        let state = StateManager::spawn(MemoryStore::new());
        let mut worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();
        state
            .update_one(
                WorkerRecord::collection_name(),
                vec![docstore::Filter::eq("id", worker.id())],
                Update::new()
                    .set("status", "job_pending")
                    .set("job_id", "j1")
                    .set("job_type", "reticulate_splines"),
            )
            .await
            .unwrap();

        let err = worker.poll_once().await.unwrap_err();
        assert!(matches!(err, WorkerError::UnrecognisedJobType(ref t) if t == "reticulate_splines"));
    }

    #[tokio::test]
    async fn test_timed_out_worker_re_registers() {
        let state = StateManager::spawn(MemoryStore::new());
        let mut worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();
        let original = worker.id().to_string();
        state.update_worker_status(&original, WorkerStatus::TimedOut).await.unwrap();

        worker.poll_once().await.unwrap();

        assert_ne!(worker.id(), original);
        let record = state.get_worker(worker.id()).await.unwrap().unwrap();
        assert_eq!(record.status, WorkerStatus::New);
        assert_eq!(state.list_workers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_record_is_fatal() {
        let state = StateManager::spawn(MemoryStore::new());
        let mut worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();
        state.clear_all_collections().await.unwrap();

        assert!(matches!(worker.poll_once().await, Err(WorkerError::MissingRecord(_))));
    }

    #[tokio::test]
    async fn test_run_exits_when_process_is_not_active() {
        let state = StateManager::spawn(MemoryStore::new());
        state.start_process().await.unwrap();
        state.set_process_status(ProcessStatus::Complete).await.unwrap();

        let worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();
        let id = worker.id().to_string();
        let summary = worker.run().await.unwrap();

        assert_eq!(summary.worker_id, id);
        assert_eq!(summary.text_jobs, 0);
    }

    #[tokio::test]
    async fn test_run_exits_after_failed_run() {
        let state = StateManager::spawn(MemoryStore::new());
        state.start_process().await.unwrap();
        let worker = Worker::register(state.clone(), "unused.txt", POLL).await.unwrap();

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        state.set_process_status(ProcessStatus::Error).await.unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(summary.amalgamation_jobs, 0);
    }
}
