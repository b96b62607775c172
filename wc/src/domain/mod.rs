//! Domain types for WordCount
//!
//! Status vocabulary plus the records every process reads and writes.
//! All records implement the Record trait for coordination store persistence.

mod job;
mod record;
mod status;

pub use job::{AmalgamationJob, FinalWordCount, JobResultShard, LineRange, TextJob};
pub use record::{ControllerRecord, ProcessRecord, WorkerRecord};
pub use status::{ControllerStatus, JobStatus, JobType, ParseStatusError, ProcessStatus, WorkerStatus};

// Re-export docstore types for convenience
pub use docstore::{CoordinationStore, Filter, FilterOp, IndexValue, Record, Update};
