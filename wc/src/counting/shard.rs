//! Prefix sharding of word counts
//!
//! Single-character words shard under themselves, every other word under
//! its first two characters. Amalgamation runs once per possible prefix.

use std::collections::BTreeMap;

use super::WordCounts;

/// Shard key of a word
pub fn prefix_of(word: &str) -> &str {
    match word.char_indices().nth(2) {
        Some((end, _)) => &word[..end],
        None => word,
    }
}

/// Split word counts into per-prefix maps, ordered by prefix
///
/// Every word lands in exactly one shard. An empty input yields no shards.
pub fn shard_by_prefix(counts: &WordCounts) -> Vec<(String, BTreeMap<String, u64>)> {
    let sorted: BTreeMap<&str, u64> = counts.iter().map(|(w, n)| (w.as_str(), *n)).collect();

    let mut shards: Vec<(String, BTreeMap<String, u64>)> = Vec::new();
    for (word, count) in sorted {
        let prefix = prefix_of(word);
        match shards.last_mut() {
            Some((current, words)) if current.as_str() == prefix => {
                words.insert(word.to_string(), count);
            }
            _ => {
                let mut words = BTreeMap::new();
                words.insert(word.to_string(), count);
                shards.push((prefix.to_string(), words));
            }
        }
    }
    shards
}

/// The full amalgamation job space: `a`, `aa`..`az`, `b`, `ba`..`zz`
pub fn amalgamation_prefixes() -> Vec<String> {
    let mut prefixes = Vec::with_capacity(26 * 27);
    for first in 'a'..='z' {
        prefixes.push(first.to_string());
        for second in 'a'..='z' {
            prefixes.push(format!("{first}{second}"));
        }
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefix_of() {
        assert_eq!(prefix_of("a"), "a");
        assert_eq!(prefix_of("an"), "an");
        assert_eq!(prefix_of("the"), "th");
        assert_eq!(prefix_of("aé"), "aé");
        assert_eq!(prefix_of("aéb"), "aé");
    }

    #[test]
    fn test_two_line_scenario_shards() {
        let counts: WordCounts = [("the", 2), ("cat", 1), ("sat", 2), ("dog", 1)]
            .into_iter()
            .map(|(w, n)| (w.to_string(), n))
            .collect();
        let shards = shard_by_prefix(&counts);
        let prefixes: Vec<_> = shards.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(prefixes, vec!["ca", "do", "sa", "th"]);
        assert_eq!(shards[3].1.get("the"), Some(&2));
        assert_eq!(shards[2].1.get("sat"), Some(&2));
    }

    #[test]
    fn test_single_letter_words_get_own_shard() {
        let counts: WordCounts = [("a", 3), ("an", 1), ("and", 2)]
            .into_iter()
            .map(|(w, n)| (w.to_string(), n))
            .collect();
        let shards = shard_by_prefix(&counts);
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].0, "a");
        assert_eq!(shards[0].1.len(), 1);
        assert_eq!(shards[1].0, "an");
        assert_eq!(shards[1].1.len(), 2);
    }

    #[test]
    fn test_empty_counts_have_no_shards() {
        assert!(shard_by_prefix(&WordCounts::new()).is_empty());
    }

    #[test]
    fn test_amalgamation_space() {
        let prefixes = amalgamation_prefixes();
        assert_eq!(prefixes.len(), 702);
        assert_eq!(prefixes.iter().filter(|p| p.len() == 1).count(), 26);
        assert_eq!(prefixes.iter().filter(|p| p.len() == 2).count(), 676);
        assert_eq!(prefixes.iter().collect::<HashSet<_>>().len(), 702);
        assert_eq!(&prefixes[..3], &["a", "aa", "ab"]);
        assert_eq!(prefixes.last().map(String::as_str), Some("zz"));
    }

    proptest! {
        #[test]
        fn prop_sharding_is_a_partition(words in prop::collection::hash_map("[a-z]{1,8}", 1u64..50, 0..60)) {
            let shards = shard_by_prefix(&words);

            let mut seen = HashSet::new();
            for (prefix, shard) in &shards {
                for (word, count) in shard {
                    prop_assert_eq!(prefix_of(word), prefix.as_str());
                    prop_assert!(seen.insert(word.clone()), "word {} in two shards", word);
                    prop_assert_eq!(words.get(word), Some(count));
                }
            }
            prop_assert_eq!(seen.len(), words.len());
        }
    }
}
