//! Status and type vocabulary shared by every process of a run

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored status string that matches no known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognised {kind} <{value}>")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseStatusError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Status of the run as a whole, read by every worker to know when to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Run in progress
    #[default]
    Active,
    /// Both scheduling phases finished
    Complete,
    /// Controller hit a fatal error
    Error,
}

string_enum!(ProcessStatus, "process status", {
    Active => "active",
    Complete => "complete",
    Error => "error",
});

/// Lifecycle of the controller record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerStatus {
    #[default]
    Active,
    Finished,
}

string_enum!(ControllerStatus, "controller status", {
    Active => "active",
    Finished => "finished",
});

/// Worker state machine: `new -> idle <-> job_pending -> working -> idle`
///
/// `timed_out` is only ever written by a timeout detector; a worker that
/// sees it re-registers under a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Freshly registered, never assigned
    #[default]
    New,
    /// Finished a job, waiting for the next
    Idle,
    /// Assigned by the controller but not yet picked up
    JobPending,
    /// Executing a job
    Working,
    /// Considered dead; must re-register to take part again
    TimedOut,
}

string_enum!(WorkerStatus, "worker status", {
    New => "new",
    Idle => "idle",
    JobPending => "job_pending",
    Working => "working",
    TimedOut => "timed_out",
});

impl WorkerStatus {
    /// Whether the controller may hand this worker a job
    pub fn is_available(&self) -> bool {
        matches!(self, Self::New | Self::Idle)
    }

    /// Statuses in which a worker can receive an assignment
    pub fn available() -> [WorkerStatus; 2] {
        [Self::New, Self::Idle]
    }
}

/// Job lifecycle; text jobs start at `Pending`, amalgamation jobs at `Unassigned`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Unassigned,
    Pending,
    Complete,
}

string_enum!(JobStatus, "job status", {
    Unassigned => "unassigned",
    Pending => "pending",
    Complete => "complete",
});

/// Kind of work a worker is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Count words in a line range
    TextProcessing,
    /// Merge every shard of one prefix
    Amalgamation,
}

string_enum!(JobType, "job type", {
    TextProcessing => "text_processing",
    Amalgamation => "amalgamation",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for status in [
            WorkerStatus::New,
            WorkerStatus::Idle,
            WorkerStatus::JobPending,
            WorkerStatus::Working,
            WorkerStatus::TimedOut,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert_eq!(serde_json::to_string(&JobType::TextProcessing).unwrap(), "\"text_processing\"");
    }

    #[test]
    fn test_from_str_round_trip() {
        assert_eq!("job_pending".parse::<WorkerStatus>().unwrap(), WorkerStatus::JobPending);
        assert_eq!("amalgamation".parse::<JobType>().unwrap(), JobType::Amalgamation);
        assert_eq!("finished".parse::<ControllerStatus>().unwrap(), ControllerStatus::Finished);
    }

    #[test]
    fn test_unrecognised_value() {
        let err = "sorting".parse::<JobType>().unwrap_err();
        assert_eq!(err.kind, "job type");
        assert_eq!(err.value, "sorting");
        assert_eq!(err.to_string(), "Unrecognised job type <sorting>");
    }

    #[test]
    fn test_worker_availability() {
        assert!(WorkerStatus::New.is_available());
        assert!(WorkerStatus::Idle.is_available());
        assert!(!WorkerStatus::JobPending.is_available());
        assert!(!WorkerStatus::Working.is_available());
        assert!(!WorkerStatus::TimedOut.is_available());
    }
}
