use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static pattern"));

/// Lowercase and tokenize on maximal runs of word characters, tallying
/// occurrences (spec §4.6). Empty input yields an empty mapping.
pub fn count_words(text: &str) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    if text.is_empty() {
        return counts;
    }
    let lower = text.to_lowercase();
    for m in WORD_PATTERN.find_iter(&lower) {
        *counts.entry(m.as_str().to_string()).or_insert(0u64) += 1;
    }
    counts
}

/// Additive bulk merge, one key at a time (spec §9 design note: the
/// "Counter" model is a mapping word -> non-negative integer with an
/// additive bulk merge).
pub fn merge_counts(into: &mut HashMap<String, u64>, other: &HashMap<String, u64>) {
    for (word, count) in other {
        *into.entry(word.clone()).or_insert(0) += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_case_insensitive_and_tokenized_on_word_boundaries() {
        let counts = count_words("The quick, quick fox-jumps!");
        assert_eq!(counts.get("quick"), Some(&2));
        assert_eq!(counts.get("fox"), Some(&1));
        assert_eq!(counts.get("jumps"), Some(&1));
        assert_eq!(counts.get("the"), Some(&1));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(count_words("").is_empty());
    }

    #[test]
    fn merge_counts_is_additive() {
        let mut total = HashMap::new();
        total.insert("a".to_string(), 1u64);
        let mut other = HashMap::new();
        other.insert("a".to_string(), 2u64);
        other.insert("b".to_string(), 1u64);
        merge_counts(&mut total, &other);
        assert_eq!(total.get("a"), Some(&3));
        assert_eq!(total.get("b"), Some(&1));
    }
}
