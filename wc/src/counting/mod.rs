//! Word counting, prefix sharding and shard merging
//!
//! Pure functions used by the worker executors.

mod merge;
mod shard;
mod tokenize;

use std::collections::HashMap;

pub use merge::merge_shards;
pub use shard::{amalgamation_prefixes, prefix_of, shard_by_prefix};
pub use tokenize::{count_line, count_lines};

/// Per-job accumulator of lower-cased word counts
pub type WordCounts = HashMap<String, u64>;
