//! Carve counted lines into fixed-size text jobs
//!
//! Jobs are carved strictly in order from the high-water mark. A full job
//! needs more than `job_size` uncarved counted lines; the shorter tail job
//! is only carved once counting has finished.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::domain::LineRange;

use super::run_state::{RunSnapshot, RunState};

/// Errors from carving jobs
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Unable to count lines of the source")]
    LineCountFailed,
}

/// What the partitioner can do with the current count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Every line is already in a job
    Done,
    /// Carve this range next
    Carve(LineRange),
    /// Not enough counted lines yet for a full job
    Wait,
}

/// Decide the next job from a snapshot of the run state
pub fn plan_next(snapshot: RunSnapshot, job_size: u64) -> Plan {
    let RunSnapshot {
        total_lines,
        count_finished,
        last_carved,
        ..
    } = snapshot;

    if count_finished && last_carved >= total_lines {
        return Plan::Done;
    }

    if total_lines.saturating_sub(last_carved) > job_size {
        return Plan::Carve(LineRange::new(last_carved + 1, last_carved + job_size));
    }

    if count_finished {
        Plan::Carve(LineRange::new(last_carved + 1, total_lines))
    } else {
        Plan::Wait
    }
}

/// Carves jobs against the live run state
pub struct Partitioner {
    state: Arc<RunState>,
    job_size: u64,
    line_wait: Duration,
}

impl Partitioner {
    pub fn new(state: Arc<RunState>, job_size: u64, line_wait: Duration) -> Self {
        Self {
            state,
            job_size,
            line_wait,
        }
    }

    /// Carve the next range, or `None` when every line is in a job
    ///
    /// While too few lines are counted for a full job this waits, polling
    /// the run state, so the calling scheduling pass stalls until the count
    /// catches up or finishes. A failed count ends the wait with an error.
    pub async fn next_range(&self) -> Result<Option<LineRange>, PartitionError> {
        debug!(job_size = self.job_size, "next_range: called");
        loop {
            let snapshot = self.state.snapshot();
            if snapshot.count_error {
                return Err(PartitionError::LineCountFailed);
            }

            match plan_next(snapshot, self.job_size) {
                Plan::Done => return Ok(None),
                Plan::Carve(range) => {
                    self.state.advance_carved(range.last_line);
                    debug!(%range, "next_range: carved");
                    return Ok(Some(range));
                }
                Plan::Wait => {
                    debug!(
                        total_lines = snapshot.total_lines,
                        last_carved = snapshot.last_carved,
                        "next_range: waiting for more counted lines"
                    );
                    tokio::time::sleep(self.line_wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(total_lines: u64, count_finished: bool, last_carved: u64) -> RunSnapshot {
        RunSnapshot {
            total_lines,
            count_finished,
            count_error: false,
            last_carved,
        }
    }

    #[test]
    fn test_plan_full_job_needs_more_than_job_size() {
        assert_eq!(plan_next(snapshot(10, false, 0), 4), Plan::Carve(LineRange::new(1, 4)));
        assert_eq!(plan_next(snapshot(10, false, 4), 4), Plan::Carve(LineRange::new(5, 8)));
        // exactly job_size uncounted lines left is not enough while counting
        assert_eq!(plan_next(snapshot(12, false, 8), 4), Plan::Wait);
        assert_eq!(plan_next(snapshot(10, false, 8), 4), Plan::Wait);
    }

    #[test]
    fn test_plan_tail_job_after_count_finishes() {
        assert_eq!(plan_next(snapshot(10, true, 8), 4), Plan::Carve(LineRange::new(9, 10)));
        assert_eq!(plan_next(snapshot(12, true, 8), 4), Plan::Carve(LineRange::new(9, 12)));
        assert_eq!(plan_next(snapshot(10, true, 10), 4), Plan::Done);
    }

    #[test]
    fn test_plan_empty_source() {
        assert_eq!(plan_next(snapshot(0, false, 0), 4), Plan::Wait);
        assert_eq!(plan_next(snapshot(0, true, 0), 4), Plan::Done);
    }

    #[test]
    fn test_plan_two_line_scenario() {
        assert_eq!(plan_next(snapshot(2, true, 0), 2_000_000), Plan::Carve(LineRange::new(1, 2)));
        assert_eq!(plan_next(snapshot(2, true, 2), 2_000_000), Plan::Done);
    }

    #[tokio::test]
    async fn test_next_range_waits_for_count() {
        let state = Arc::new(RunState::new());
        let partitioner = Partitioner::new(state.clone(), 3, Duration::from_millis(5));

        let counter = {
            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                state.record_lines(5);
                state.finish_count();
            })
        };

        assert_eq!(partitioner.next_range().await.unwrap(), Some(LineRange::new(1, 3)));
        assert_eq!(partitioner.next_range().await.unwrap(), Some(LineRange::new(4, 5)));
        assert_eq!(partitioner.next_range().await.unwrap(), None);
        assert_eq!(state.last_carved(), 5);
        counter.await.unwrap();
    }

    #[tokio::test]
    async fn test_next_range_fails_when_count_fails_during_wait() {
        let state = Arc::new(RunState::new());
        let partitioner = Partitioner::new(state.clone(), 3, Duration::from_millis(5));

        let counter = {
            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                state.fail_count();
            })
        };

        let result = partitioner.next_range().await;
        assert!(matches!(result, Err(PartitionError::LineCountFailed)));
        counter.await.unwrap();
    }

    proptest! {
        #[test]
        fn prop_jobs_tile_all_lines(
            increments in prop::collection::vec(0u64..50, 0..30),
            job_size in 1u64..20,
        ) {
            let state = RunState::new();
            let mut ranges = Vec::new();

            // counting grows in bursts; carve whatever is ready after each burst
            let mut total = 0;
            for inc in increments {
                total += inc;
                state.record_lines(total);
                while let Plan::Carve(range) = plan_next(state.snapshot(), job_size) {
                    state.advance_carved(range.last_line);
                    ranges.push(range);
                }
            }

            state.finish_count();
            loop {
                match plan_next(state.snapshot(), job_size) {
                    Plan::Carve(range) => {
                        state.advance_carved(range.last_line);
                        ranges.push(range);
                    }
                    Plan::Done => break,
                    Plan::Wait => prop_assert!(false, "waited after count finished"),
                }
            }

            let mut expected_first = 1;
            for (i, range) in ranges.iter().enumerate() {
                prop_assert_eq!(range.first_line, expected_first);
                if i + 1 < ranges.len() {
                    prop_assert_eq!(range.len(), job_size);
                } else {
                    prop_assert!(range.len() <= job_size);
                }
                expected_first = range.last_line + 1;
            }
            prop_assert_eq!(expected_first - 1, total);
        }
    }
}
