//! Rendering of results and run status for the CLI

use colored::Colorize;
use serde::Serialize;

use crate::domain::{ControllerRecord, FinalWordCount};
use crate::state::RunProgress;

/// One word with its total count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordTotal {
    pub word: String,
    pub count: u64,
}

/// Flatten final records into words, most frequent first
///
/// Ties are broken alphabetically so output is stable across runs.
pub fn top_words(records: &[FinalWordCount], top: Option<usize>) -> Vec<WordTotal> {
    let mut words: Vec<WordTotal> = records
        .iter()
        .flat_map(|r| r.word_counts.iter())
        .map(|(word, count)| WordTotal {
            word: word.clone(),
            count: *count,
        })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    if let Some(n) = top {
        words.truncate(n);
    }
    words
}

pub fn render_words(words: &[WordTotal]) -> String {
    let width = words.first().map(|w| w.count.to_string().len()).unwrap_or(1);
    let mut out = String::new();
    for w in words {
        out.push_str(&format!("{:>width$}  {}\n", w.count.to_string().cyan(), w.word.bold()));
    }
    out
}

pub fn render_status(progress: &RunProgress, controller: Option<&ControllerRecord>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "WordCount Status".bold()));
    out.push_str("----------------\n");

    let process = match progress.process {
        Some(status) => status.to_string().green().to_string(),
        None => "not started".dimmed().to_string(),
    };
    out.push_str(&format!("Process:     {}\n", process));

    match controller {
        Some(c) => {
            let elected = chrono::DateTime::from_timestamp_millis(c.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| c.created_at.to_string());
            out.push_str(&format!("Controller:  {} ({}, elected {})\n", c.id.yellow(), c.status, elected));
        }
        None => out.push_str(&format!("Controller:  {}\n", "none".dimmed())),
    }

    let total_workers: u64 = progress.workers.values().sum();
    out.push_str(&format!("Workers:     {}\n", total_workers));
    for (status, count) in &progress.workers {
        out.push_str(&format!("  {:<12} {}\n", status, count));
    }

    out.push('\n');
    out.push_str(&format!(
        "Text jobs:          {}/{} complete\n",
        progress.text_jobs_complete, progress.text_jobs
    ));
    out.push_str(&format!(
        "Amalgamation jobs:  {}/{} complete, {} in progress\n",
        progress.amalgamation_complete, progress.amalgamation_jobs, progress.amalgamation_pending
    ));
    out
}
