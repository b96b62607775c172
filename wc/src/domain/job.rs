//! Job records and their results

use std::collections::BTreeMap;
use std::fmt;

use docstore::{Record, now_ms};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::JobStatus;

/// Inclusive, 1-based range of source lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub first_line: u64,
    pub last_line: u64,
}

impl LineRange {
    pub fn new(first_line: u64, last_line: u64) -> Self {
        debug_assert!(first_line >= 1 && first_line <= last_line);
        Self { first_line, last_line }
    }

    /// Number of lines covered, zero for an inverted range
    pub fn len(&self) -> u64 {
        (self.last_line + 1).saturating_sub(self.first_line)
    }

    pub fn is_empty(&self) -> bool {
        self.last_line < self.first_line
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.first_line, self.last_line)
    }
}

/// Count words in one line range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextJob {
    pub id: String,
    pub first_line: u64,
    pub last_line: u64,
    pub status: JobStatus,
    pub created_at: i64,
}

impl TextJob {
    pub fn new(range: LineRange) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            first_line: range.first_line,
            last_line: range.last_line,
            status: JobStatus::Pending,
            created_at: now_ms(),
        }
    }

    pub fn range(&self) -> LineRange {
        LineRange {
            first_line: self.first_line,
            last_line: self.last_line,
        }
    }
}

impl Record for TextJob {
    fn collection_name() -> &'static str {
        "jobs"
    }
}

/// The words of one text job that share a prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultShard {
    pub id: String,
    pub job_id: String,
    pub prefix: String,
    pub word_counts: BTreeMap<String, u64>,
}

impl JobResultShard {
    pub fn new(job_id: impl Into<String>, prefix: impl Into<String>, word_counts: BTreeMap<String, u64>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            job_id: job_id.into(),
            prefix: prefix.into(),
            word_counts,
        }
    }
}

impl Record for JobResultShard {
    fn collection_name() -> &'static str {
        "job_results"
    }
}

/// Merge work for one prefix; the prefix doubles as the identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmalgamationJob {
    pub id: String,
    pub prefix: String,
    pub status: JobStatus,
}

impl AmalgamationJob {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            id: prefix.clone(),
            prefix,
            status: JobStatus::Unassigned,
        }
    }
}

impl Record for AmalgamationJob {
    fn collection_name() -> &'static str {
        "amalgamation_jobs"
    }
}

/// Final totals for one prefix, written once when its merge completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalWordCount {
    pub id: String,
    pub prefix: String,
    pub word_counts: BTreeMap<String, u64>,
}

impl FinalWordCount {
    pub fn new(prefix: impl Into<String>, word_counts: BTreeMap<String, u64>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            prefix: prefix.into(),
            word_counts,
        }
    }

    pub fn total(&self) -> u64 {
        self.word_counts.values().sum()
    }
}

impl Record for FinalWordCount {
    fn collection_name() -> &'static str {
        "final_word_counts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_range_len_and_display() {
        let range = LineRange::new(1, 2_000_000);
        assert_eq!(range.len(), 2_000_000);
        assert_eq!(LineRange::new(5, 5).len(), 1);
        assert_eq!(range.to_string(), "[1, 2000000]");
        assert!(!range.is_empty());
    }

    #[test]
    fn test_inverted_stored_range_is_empty() {
        let doc = serde_json::json!({
            "id": "j1",
            "first_line": 5,
            "last_line": 4,
            "status": "pending",
            "created_at": 0,
        });
        let job = TextJob::from_document(doc.as_object().cloned().unwrap()).unwrap();
        assert!(job.range().is_empty());
        assert_eq!(job.range().len(), 0);
    }

    #[test]
    fn test_text_job_starts_pending() {
        let job = TextJob::new(LineRange::new(3, 9));
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.range(), LineRange::new(3, 9));
    }

    #[test]
    fn test_amalgamation_job_identity_is_prefix() {
        let job = AmalgamationJob::new("th");
        assert_eq!(job.id, "th");
        assert_eq!(job.status, JobStatus::Unassigned);
    }

    #[test]
    fn test_shard_document_keeps_sorted_words() {
        let mut words = BTreeMap::new();
        words.insert("that".to_string(), 1);
        words.insert("the".to_string(), 2);
        let shard = JobResultShard::new("j1", "th", words);
        let doc = shard.to_document().unwrap();
        let keys: Vec<_> = doc["word_counts"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["that", "the"]);
    }
}
