//! Typed coordination operations on top of the generic store commands
//!
//! These are the only reads and writes the controller, workers and CLI
//! perform against the shared store.

use std::collections::BTreeMap;

use docstore::{Filter, ID_FIELD, Record, Update, now_ms};
use serde::Serialize;
use tracing::{debug, info};

use crate::counting::{WordCounts, amalgamation_prefixes, shard_by_prefix};
use crate::domain::{
    AmalgamationJob, ControllerRecord, ControllerStatus, FinalWordCount, JobResultShard, JobStatus, JobType, LineRange,
    ProcessRecord, ProcessStatus, TextJob, WorkerRecord, WorkerStatus,
};

use super::StateManager;
use super::messages::{StateError, StateResponse};

/// Every collection a run writes to, cleared together on reset
pub fn all_collections() -> [&'static str; 7] {
    [
        ControllerRecord::collection_name(),
        WorkerRecord::collection_name(),
        TextJob::collection_name(),
        JobResultShard::collection_name(),
        AmalgamationJob::collection_name(),
        ProcessRecord::collection_name(),
        FinalWordCount::collection_name(),
    ]
}

/// Snapshot of a run's progress, as shown by `wordcount status`
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunProgress {
    /// Overall process status, if a run was ever started
    pub process: Option<ProcessStatus>,
    /// Status of the most recent controller
    pub controller: Option<ControllerStatus>,
    /// Worker count per status
    pub workers: BTreeMap<String, u64>,
    /// Text jobs created so far
    pub text_jobs: u64,
    /// Text jobs reported complete
    pub text_jobs_complete: u64,
    /// Amalgamation jobs created (0 or 702)
    pub amalgamation_jobs: u64,
    /// Amalgamation jobs claimed but not complete
    pub amalgamation_pending: u64,
    /// Amalgamation jobs complete
    pub amalgamation_complete: u64,
}

impl StateManager {
    // === Controller ===

    /// Elect the caller as controller, replacing any previous registration
    pub async fn register_controller(&self) -> StateResponse<String> {
        debug!("register_controller: called");
        self.delete_many(ControllerRecord::collection_name(), vec![]).await?;
        let id = self.insert_record(&ControllerRecord::new()).await?;
        info!(controller_id = %id, "Registered as controller");
        Ok(id)
    }

    pub async fn is_controller_active(&self) -> StateResponse<bool> {
        debug!("is_controller_active: called");
        let active = self
            .find_records::<ControllerRecord>(vec![Filter::eq("status", ControllerStatus::Active.as_str())])
            .await?;
        Ok(!active.is_empty())
    }

    pub async fn set_controller_status(&self, id: &str, status: ControllerStatus) -> StateResponse<()> {
        debug!(%id, %status, "set_controller_status: called");
        self.update_one(
            ControllerRecord::collection_name(),
            vec![Filter::eq(ID_FIELD, id)],
            Update::new().set("status", status.as_str()),
        )
        .await?;
        Ok(())
    }

    pub async fn controller(&self) -> StateResponse<Option<ControllerRecord>> {
        debug!("controller: called");
        Ok(self.find_records::<ControllerRecord>(vec![]).await?.into_iter().last())
    }

    // === Workers ===

    /// Register a new worker in state `new`, returning its identity
    pub async fn register_worker(&self) -> StateResponse<String> {
        debug!("register_worker: called");
        self.insert_record(&WorkerRecord::new()).await
    }

    pub async fn list_workers(&self) -> StateResponse<Vec<WorkerRecord>> {
        debug!("list_workers: called");
        self.find_records(vec![]).await
    }

    pub async fn get_worker(&self, id: &str) -> StateResponse<Option<WorkerRecord>> {
        debug!(%id, "get_worker: called");
        self.find_record(id).await
    }

    pub async fn update_worker_status(&self, id: &str, status: WorkerStatus) -> StateResponse<()> {
        debug!(%id, %status, "update_worker_status: called");
        let matched = self
            .update_one(
                WorkerRecord::collection_name(),
                vec![Filter::eq(ID_FIELD, id)],
                Update::new().set("status", status.as_str()).set("updated_at", now_ms()),
            )
            .await?;
        if !matched {
            return Err(StateError::NotFound(format!("Worker {}", id)));
        }
        Ok(())
    }

    /// Hand a job to a worker that is still `new` or `idle`
    ///
    /// Returns false when the worker left those states since it was listed;
    /// the job is then not assigned to anyone.
    pub async fn assign_job_to_worker(&self, worker_id: &str, job_id: &str, job_type: JobType) -> StateResponse<bool> {
        debug!(%worker_id, %job_id, %job_type, "assign_job_to_worker: called");
        let previous = self
            .find_one_and_update(
                WorkerRecord::collection_name(),
                vec![
                    Filter::eq(ID_FIELD, worker_id),
                    Filter::is_in("status", WorkerStatus::available().map(|s| s.as_str())),
                ],
                Update::new()
                    .set("job_id", job_id)
                    .set("job_type", job_type.as_str())
                    .set("status", WorkerStatus::JobPending.as_str())
                    .set("updated_at", now_ms()),
            )
            .await?;
        Ok(previous.is_some())
    }

    // === Process ===

    /// Wipe every collection of the run
    pub async fn clear_all_collections(&self) -> StateResponse<()> {
        debug!("clear_all_collections: called");
        for collection in all_collections() {
            let deleted = self.delete_many(collection, vec![]).await?;
            debug!(%collection, deleted, "clear_all_collections: cleared");
        }
        Ok(())
    }

    /// Replace any previous process record with a fresh `active` one
    pub async fn start_process(&self) -> StateResponse<()> {
        debug!("start_process: called");
        self.delete_many(ProcessRecord::collection_name(), vec![]).await?;
        self.insert_record(&ProcessRecord::started()).await?;
        Ok(())
    }

    pub async fn set_process_status(&self, status: ProcessStatus) -> StateResponse<()> {
        debug!(%status, "set_process_status: called");
        self.update_one(
            ProcessRecord::collection_name(),
            vec![],
            Update::new().set("status", status.as_str()),
        )
        .await?;
        Ok(())
    }

    /// Status of the current run, `None` when no run has started
    pub async fn process_status(&self) -> StateResponse<Option<ProcessStatus>> {
        debug!("process_status: called");
        let records = self.find_records::<ProcessRecord>(vec![]).await?;
        Ok(records.into_iter().next().map(|p| p.status))
    }

    // === Text jobs ===

    pub async fn create_text_job(&self, range: LineRange) -> StateResponse<String> {
        debug!(%range, "create_text_job: called");
        self.insert_record(&TextJob::new(range)).await
    }

    pub async fn get_text_job(&self, id: &str) -> StateResponse<Option<TextJob>> {
        debug!(%id, "get_text_job: called");
        self.find_record(id).await
    }

    /// Write one shard per distinct prefix, then mark the job complete
    pub async fn complete_text_job(&self, job_id: &str, counts: &WordCounts) -> StateResponse<()> {
        debug!(%job_id, words = counts.len(), "complete_text_job: called");
        let shards: Vec<JobResultShard> = shard_by_prefix(counts)
            .into_iter()
            .map(|(prefix, words)| JobResultShard::new(job_id, prefix, words))
            .collect();

        if !shards.is_empty() {
            self.insert_records(&shards).await?;
        }

        let matched = self
            .update_one(
                TextJob::collection_name(),
                vec![Filter::eq(ID_FIELD, job_id)],
                Update::new().set("status", JobStatus::Complete.as_str()),
            )
            .await?;
        if !matched {
            return Err(StateError::NotFound(format!("Text job {}", job_id)));
        }
        debug!(%job_id, shards = shards.len(), "complete_text_job: done");
        Ok(())
    }

    pub async fn all_text_jobs_complete(&self) -> StateResponse<bool> {
        debug!("all_text_jobs_complete: called");
        let open = self
            .find(
                TextJob::collection_name(),
                vec![Filter::ne("status", JobStatus::Complete.as_str())],
            )
            .await?;
        Ok(open.is_empty())
    }

    // === Amalgamation jobs ===

    /// Create the full prefix job set, every job `unassigned`
    pub async fn create_amalgamation_jobs(&self) -> StateResponse<usize> {
        debug!("create_amalgamation_jobs: called");
        let jobs: Vec<AmalgamationJob> = amalgamation_prefixes().into_iter().map(AmalgamationJob::new).collect();
        Ok(self.insert_records(&jobs).await?.len())
    }

    /// Atomically move the first `unassigned` job to `pending`, returning its prefix
    pub async fn claim_next_amalgamation_job(&self) -> StateResponse<Option<String>> {
        debug!("claim_next_amalgamation_job: called");
        let claimed = self
            .find_one_and_update(
                AmalgamationJob::collection_name(),
                vec![Filter::eq("status", JobStatus::Unassigned.as_str())],
                Update::new().set("status", JobStatus::Pending.as_str()),
            )
            .await?;
        match claimed {
            Some(doc) => Ok(Some(AmalgamationJob::from_document(doc)?.prefix)),
            None => Ok(None),
        }
    }

    pub async fn shard_results_for_prefix(&self, prefix: &str) -> StateResponse<Vec<JobResultShard>> {
        debug!(%prefix, "shard_results_for_prefix: called");
        self.find_records(vec![Filter::eq("prefix", prefix)]).await
    }

    /// Write the final totals for a prefix, then mark its job complete
    pub async fn complete_amalgamation_job(&self, prefix: &str, totals: BTreeMap<String, u64>) -> StateResponse<()> {
        debug!(%prefix, words = totals.len(), "complete_amalgamation_job: called");
        self.insert_record(&FinalWordCount::new(prefix, totals)).await?;

        let matched = self
            .update_one(
                AmalgamationJob::collection_name(),
                vec![Filter::eq("prefix", prefix)],
                Update::new().set("status", JobStatus::Complete.as_str()),
            )
            .await?;
        if !matched {
            return Err(StateError::NotFound(format!("Amalgamation job {}", prefix)));
        }
        Ok(())
    }

    pub async fn all_amalgamation_jobs_complete(&self) -> StateResponse<bool> {
        debug!("all_amalgamation_jobs_complete: called");
        let open = self
            .find(
                AmalgamationJob::collection_name(),
                vec![Filter::ne("status", JobStatus::Complete.as_str())],
            )
            .await?;
        Ok(open.is_empty())
    }

    // === Results ===

    /// Final totals for every prefix, or just one
    pub async fn final_word_counts(&self, prefix: Option<&str>) -> StateResponse<Vec<FinalWordCount>> {
        debug!(?prefix, "final_word_counts: called");
        let filters = prefix.map(|p| vec![Filter::eq("prefix", p)]).unwrap_or_default();
        let mut records: Vec<FinalWordCount> = self.find_records(filters).await?;
        records.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Ok(records)
    }

    pub async fn progress(&self) -> StateResponse<RunProgress> {
        debug!("progress: called");
        let mut progress = RunProgress {
            process: self.process_status().await?,
            controller: self.controller().await?.map(|c| c.status),
            ..Default::default()
        };

        for worker in self.list_workers().await? {
            *progress.workers.entry(worker.status.to_string()).or_insert(0) += 1;
        }

        let text_jobs: Vec<TextJob> = self.find_records(vec![]).await?;
        progress.text_jobs = text_jobs.len() as u64;
        progress.text_jobs_complete = text_jobs.iter().filter(|j| j.status == JobStatus::Complete).count() as u64;

        let amalgamation_jobs: Vec<AmalgamationJob> = self.find_records(vec![]).await?;
        progress.amalgamation_jobs = amalgamation_jobs.len() as u64;
        for job in &amalgamation_jobs {
            match job.status {
                JobStatus::Pending => progress.amalgamation_pending += 1,
                JobStatus::Complete => progress.amalgamation_complete += 1,
                JobStatus::Unassigned => {}
            }
        }

        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::MemoryStore;

    fn manager() -> StateManager {
        StateManager::spawn(MemoryStore::new())
    }

    fn counts(pairs: &[(&str, u64)]) -> WordCounts {
        pairs.iter().map(|(w, n)| (w.to_string(), *n)).collect()
    }

    #[tokio::test]
    async fn test_controller_registration_and_status() {
        let state = manager();
        assert!(!state.is_controller_active().await.unwrap());

        let id = state.register_controller().await.unwrap();
        assert!(state.is_controller_active().await.unwrap());

        state.set_controller_status(&id, ControllerStatus::Finished).await.unwrap();
        assert!(!state.is_controller_active().await.unwrap());
        assert_eq!(state.controller().await.unwrap().unwrap().status, ControllerStatus::Finished);
    }

    #[tokio::test]
    async fn test_assignment_only_succeeds_for_available_worker() {
        let state = manager();
        let worker = state.register_worker().await.unwrap();

        assert!(state.assign_job_to_worker(&worker, "j1", JobType::TextProcessing).await.unwrap());
        let record = state.get_worker(&worker).await.unwrap().unwrap();
        assert_eq!(record.status, WorkerStatus::JobPending);
        assert_eq!(record.job_id.as_deref(), Some("j1"));
        assert_eq!(record.job_type.as_deref(), Some("text_processing"));

        // job_pending is not available
        assert!(!state.assign_job_to_worker(&worker, "j2", JobType::TextProcessing).await.unwrap());
        let record = state.get_worker(&worker).await.unwrap().unwrap();
        assert_eq!(record.job_id.as_deref(), Some("j1"));

        state.update_worker_status(&worker, WorkerStatus::Idle).await.unwrap();
        assert!(state.assign_job_to_worker(&worker, "th", JobType::Amalgamation).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_unknown_worker_is_not_found() {
        let state = manager();
        let result = state.update_worker_status("missing", WorkerStatus::Idle).await;
        assert!(matches!(result, Err(StateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_process_lifecycle() {
        let state = manager();
        assert_eq!(state.process_status().await.unwrap(), None);

        state.start_process().await.unwrap();
        assert_eq!(state.process_status().await.unwrap(), Some(ProcessStatus::Active));

        state.set_process_status(ProcessStatus::Complete).await.unwrap();
        assert_eq!(state.process_status().await.unwrap(), Some(ProcessStatus::Complete));

        // restarting replaces the old record
        state.start_process().await.unwrap();
        assert_eq!(state.process_status().await.unwrap(), Some(ProcessStatus::Active));
    }

    #[tokio::test]
    async fn test_complete_text_job_writes_shards() {
        let state = manager();
        let job_id = state.create_text_job(LineRange::new(1, 2)).await.unwrap();
        assert!(!state.all_text_jobs_complete().await.unwrap());

        let job = state.get_text_job(&job_id).await.unwrap().unwrap();
        assert_eq!(job.range(), LineRange::new(1, 2));

        state
            .complete_text_job(&job_id, &counts(&[("the", 2), ("cat", 1), ("sat", 2), ("dog", 1)]))
            .await
            .unwrap();
        assert!(state.all_text_jobs_complete().await.unwrap());

        let th = state.shard_results_for_prefix("th").await.unwrap();
        assert_eq!(th.len(), 1);
        assert_eq!(th[0].job_id, job_id);
        assert_eq!(th[0].word_counts.get("the"), Some(&2));
        assert!(state.shard_results_for_prefix("zz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_text_job_with_no_words_writes_no_shards() {
        let state = manager();
        let job_id = state.create_text_job(LineRange::new(1, 1)).await.unwrap();
        state.complete_text_job(&job_id, &WordCounts::new()).await.unwrap();

        assert!(state.all_text_jobs_complete().await.unwrap());
        assert!(state.find(JobResultShard::collection_name(), vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_text_jobs_counts_as_complete() {
        let state = manager();
        assert!(state.all_text_jobs_complete().await.unwrap());
    }

    #[tokio::test]
    async fn test_amalgamation_claims_in_prefix_order() {
        let state = manager();
        assert_eq!(state.create_amalgamation_jobs().await.unwrap(), 702);

        assert_eq!(state.claim_next_amalgamation_job().await.unwrap().as_deref(), Some("a"));
        assert_eq!(state.claim_next_amalgamation_job().await.unwrap().as_deref(), Some("aa"));

        let progress = state.progress().await.unwrap();
        assert_eq!(progress.amalgamation_jobs, 702);
        assert_eq!(progress.amalgamation_pending, 2);
        assert_eq!(progress.amalgamation_complete, 0);
    }

    #[tokio::test]
    async fn test_amalgamation_completion() {
        let state = manager();
        state.create_amalgamation_jobs().await.unwrap();

        let mut claimed = 0;
        while let Some(prefix) = state.claim_next_amalgamation_job().await.unwrap() {
            let totals = if prefix == "th" {
                [("the".to_string(), 3)].into_iter().collect()
            } else {
                BTreeMap::new()
            };
            state.complete_amalgamation_job(&prefix, totals).await.unwrap();
            claimed += 1;
        }
        assert_eq!(claimed, 702);
        assert!(state.all_amalgamation_jobs_complete().await.unwrap());

        let all = state.final_word_counts(None).await.unwrap();
        assert_eq!(all.len(), 702);
        let th = state.final_word_counts(Some("th")).await.unwrap();
        assert_eq!(th.len(), 1);
        assert_eq!(th[0].total(), 3);
    }

    #[tokio::test]
    async fn test_clear_all_collections() {
        let state = manager();
        state.register_controller().await.unwrap();
        state.register_worker().await.unwrap();
        state.start_process().await.unwrap();
        state.create_amalgamation_jobs().await.unwrap();

        state.clear_all_collections().await.unwrap();

        assert!(!state.is_controller_active().await.unwrap());
        assert!(state.list_workers().await.unwrap().is_empty());
        assert_eq!(state.process_status().await.unwrap(), None);
        assert_eq!(state.progress().await.unwrap().amalgamation_jobs, 0);
    }
}
