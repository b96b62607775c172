//! Merge shards that share a prefix into final totals

use std::collections::BTreeMap;

/// Sum counts per word across every shard
///
/// Addition makes the merge order-independent.
pub fn merge_shards<'a>(shards: impl IntoIterator<Item = &'a BTreeMap<String, u64>>) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for shard in shards {
        for (word, count) in shard {
            *totals.entry(word.clone()).or_insert(0) += count;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shard(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(w, n)| (w.to_string(), *n)).collect()
    }

    #[test]
    fn test_merge_sums_overlapping_words() {
        let a = shard(&[("the", 2), ("then", 1)]);
        let b = shard(&[("the", 5), ("they", 3)]);
        assert_eq!(
            merge_shards([&a, &b]),
            shard(&[("the", 7), ("then", 1), ("they", 3)])
        );
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge_shards(std::iter::empty()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_merge_order_independent(
            shards in prop::collection::vec(prop::collection::btree_map("th[a-z]{0,3}", 1u64..100, 0..10), 0..8)
        ) {
            let forward = merge_shards(shards.iter());
            let backward = merge_shards(shards.iter().rev());
            prop_assert_eq!(&forward, &backward);

            // merging in two halves then merging the halves gives the same totals
            let mid = shards.len() / 2;
            let left = merge_shards(shards[..mid].iter());
            let right = merge_shards(shards[mid..].iter());
            prop_assert_eq!(&merge_shards([&right, &left]), &forward);
        }
    }
}
