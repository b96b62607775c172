//! Controller role: line counting, job carving and two-phase scheduling

mod line_counter;
mod partitioner;
mod run_state;
mod scheduling;

pub use partitioner::{PartitionError, Partitioner, Plan, plan_next};
pub use run_state::{RunSnapshot, RunState};
pub use scheduling::{Controller, ControllerError, RunSummary};
