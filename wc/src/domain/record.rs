//! Node records: controller, workers, and the overall process

use docstore::{Record, now_ms};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ControllerStatus, ProcessStatus, WorkerStatus};

/// The elected controller of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub id: String,
    pub status: ControllerStatus,
    /// Election timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl ControllerRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            status: ControllerStatus::Active,
            created_at: now_ms(),
        }
    }
}

impl Default for ControllerRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for ControllerRecord {
    fn collection_name() -> &'static str {
        "controller"
    }
}

/// One live worker poller
///
/// `job_id` and `job_type` are written by the controller on assignment.
/// The type stays a raw string so that a value this build does not know
/// reaches the worker and fails there instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: String,
    pub status: WorkerStatus,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    pub registered_at: i64,
    /// Last status change (Unix milliseconds)
    pub updated_at: i64,
}

impl WorkerRecord {
    pub fn new() -> Self {
        let now = now_ms();
        Self {
            id: Uuid::now_v7().to_string(),
            status: WorkerStatus::New,
            job_id: None,
            job_type: None,
            registered_at: now,
            updated_at: now,
        }
    }
}

impl Default for WorkerRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for WorkerRecord {
    fn collection_name() -> &'static str {
        "workers"
    }
}

/// Singleton status document for the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: String,
    pub status: ProcessStatus,
    pub started_at: i64,
}

impl ProcessRecord {
    pub fn started() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            status: ProcessStatus::Active,
            started_at: now_ms(),
        }
    }
}

impl Record for ProcessRecord {
    fn collection_name() -> &'static str {
        "process"
    }
}
