//! Split lines into words and count them

use std::sync::LazyLock;

use regex::Regex;

use super::WordCounts;

/// Runs of word characters; everything between them is a separator
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("static word pattern"));

/// Whether a token is counted: it must start with an ASCII letter
fn is_countable(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Add the words of one line to `counts`, lower-cased
pub fn count_line(line: &str, counts: &mut WordCounts) {
    for token in WORD.find_iter(line).map(|m| m.as_str()) {
        if !is_countable(token) {
            continue;
        }
        let word = token.to_lowercase();
        *counts.entry(word).or_insert(0) += 1;
    }
}

/// Count every word in a sequence of lines
pub fn count_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> WordCounts {
    let mut counts = WordCounts::new();
    for line in lines {
        count_line(line, &mut counts);
    }
    counts
}
