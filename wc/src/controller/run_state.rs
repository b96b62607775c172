//! In-memory state shared by the line counter and the partitioner

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Progress of the line count and of job carving
///
/// The line counter is the only writer of the total and the two flags; the
/// partitioner is the only writer of the high-water mark. Both numbers only
/// ever grow.
#[derive(Debug, Default)]
pub struct RunState {
    total_lines: AtomicU64,
    count_finished: AtomicBool,
    count_error: AtomicBool,
    last_carved: AtomicU64,
}

/// A consistent-enough view of `RunState` for one scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSnapshot {
    pub total_lines: u64,
    pub count_finished: bool,
    pub count_error: bool,
    pub last_carved: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_lines(&self) -> u64 {
        self.total_lines.load(Ordering::Acquire)
    }

    /// Raise the counted total; a smaller value is ignored
    pub fn record_lines(&self, total: u64) {
        self.total_lines.fetch_max(total, Ordering::AcqRel);
    }

    pub fn is_count_finished(&self) -> bool {
        self.count_finished.load(Ordering::Acquire)
    }

    /// Mark the count finished; the total must already be final
    pub fn finish_count(&self) {
        self.count_finished.store(true, Ordering::Release);
    }

    pub fn is_count_error(&self) -> bool {
        self.count_error.load(Ordering::Acquire)
    }

    pub fn fail_count(&self) {
        self.count_error.store(true, Ordering::Release);
    }

    pub fn last_carved(&self) -> u64 {
        self.last_carved.load(Ordering::Acquire)
    }

    /// Raise the high-water mark; a smaller value is ignored
    pub fn advance_carved(&self, last_line: u64) {
        self.last_carved.fetch_max(last_line, Ordering::AcqRel);
    }

    /// Whether every counted line is in some job and counting is over
    pub fn all_lines_carved(&self) -> bool {
        self.is_count_finished() && self.last_carved() >= self.total_lines()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        // flag before total: a finished flag guarantees the total read after it is final
        let count_finished = self.is_count_finished();
        RunSnapshot {
            count_finished,
            count_error: self.is_count_error(),
            total_lines: self.total_lines(),
            last_carved: self.last_carved(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_monotonic() {
        let state = RunState::new();
        state.record_lines(10);
        state.record_lines(4);
        assert_eq!(state.total_lines(), 10);

        state.advance_carved(6);
        state.advance_carved(2);
        assert_eq!(state.last_carved(), 6);
    }

    #[test]
    fn test_all_lines_carved_needs_finished_count() {
        let state = RunState::new();
        state.record_lines(5);
        state.advance_carved(5);
        assert!(!state.all_lines_carved());

        state.finish_count();
        assert!(state.all_lines_carved());
    }

    #[test]
    fn test_empty_input_is_carved_once_finished() {
        let state = RunState::new();
        state.finish_count();
        assert!(state.all_lines_carved());
        assert_eq!(
            state.snapshot(),
            RunSnapshot {
                total_lines: 0,
                count_finished: true,
                count_error: false,
                last_carved: 0,
            }
        );
    }
}
