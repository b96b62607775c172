//! Worker role: poll for assignments and execute them

mod executor;
mod poller;

pub use executor::{amalgamate, count_range};
pub use poller::{Worker, WorkerError, WorkerSummary};
