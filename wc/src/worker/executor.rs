//! Job executors: count a line range, merge a prefix

use std::collections::BTreeMap;

use tracing::debug;

use crate::counting::{WordCounts, count_line, merge_shards};
use crate::domain::LineRange;
use crate::source::{SourceError, SourceReader};
use crate::state::{StateManager, StateResponse};

/// Count the words of every line in `range`
///
/// The reader skips forward to the first line, or starts over when it is
/// already past it. Input ending inside the range is an error.
pub async fn count_range(reader: &mut SourceReader, range: LineRange) -> Result<WordCounts, SourceError> {
    debug!(%range, next_line = reader.next_line_number(), "count_range: called");
    let mut counts = WordCounts::new();
    if range.is_empty() {
        return Ok(counts);
    }
    reader.seek_to_line(range.first_line).await?;

    while reader.next_line_number() <= range.last_line {
        let line = reader.require_line().await?;
        count_line(&line, &mut counts);
    }
    Ok(counts)
}

/// Merge every text job shard for `prefix` and record the totals
///
/// A prefix without shards still gets an (empty) final record.
pub async fn amalgamate(state: &StateManager, prefix: &str) -> StateResponse<BTreeMap<String, u64>> {
    debug!(%prefix, "amalgamate: called");
    let shards = state.shard_results_for_prefix(prefix).await?;
    let totals = merge_shards(shards.iter().map(|s| &s.word_counts));
    debug!(%prefix, shards = shards.len(), words = totals.len(), "amalgamate: merged");

    state.complete_amalgamation_job(prefix, totals.clone()).await?;
    Ok(totals)
}
