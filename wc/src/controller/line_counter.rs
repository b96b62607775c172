//! Background count of the source's lines

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::source::{SourceError, SourceReader};

use super::run_state::RunState;

/// How many lines pass between progress log lines
const PROGRESS_EVERY: u64 = 1_000_000;

/// Start counting lines of `path` into `state`
///
/// The total grows after every line. On end of input the count is marked
/// finished; on an I/O failure it is marked failed and counting stops.
pub fn spawn(path: PathBuf, state: Arc<RunState>) -> JoinHandle<()> {
    debug!(path = %path.display(), "spawn: called");
    tokio::spawn(async move {
        match count(&path, &state).await {
            Ok(total) => {
                state.finish_count();
                info!(total_lines = total, "Line count finished");
            }
            Err(e) => {
                state.fail_count();
                error!(error = %e, "Line count failed");
            }
        }
    })
}

async fn count(path: &Path, state: &RunState) -> Result<u64, SourceError> {
    let mut reader = SourceReader::open(path).await?;
    let mut total = 0;
    while reader.read_line().await?.is_some() {
        total += 1;
        state.record_lines(total);
        if total % PROGRESS_EVERY == 0 {
            debug!(total_lines = total, "count: progress");
        }
    }
    Ok(total)
}
