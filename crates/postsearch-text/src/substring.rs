//! Fallback search by case-insensitive containment.
//!
//! Used when no index is available. A document matches when the whole
//! normalized query, or any query word of two or more characters, occurs in
//! its title, excerpt or tags. Results are ranked so they stay explainable:
//!
//! | field   | whole query | per word |
//! |---------|-------------|----------|
//! | title   | 100         | 20       |
//! | tags    | 75          | 15       |
//! | excerpt | 50          | 10       |
//!
//! A whole-query hit in a field replaces that field's word hits. An empty
//! query returns nothing. Only the first `max_words` distinct words count.

use std::collections::HashSet;
use tracing::debug;

use postsearch_core::types::{DisplayFields, SearchResult};

use crate::analyzer::normalize_text;

struct Weights {
    whole: f32,
    word: f32,
}

const TITLE: Weights = Weights { whole: 100.0, word: 20.0 };
const TAGS: Weights = Weights { whole: 75.0, word: 15.0 };
const EXCERPT: Weights = Weights { whole: 50.0, word: 10.0 };

fn field_score(text: &str, query: &str, words: &[&str], weights: &Weights) -> f32 {
    if text.contains(query) {
        return weights.whole;
    }
    words.iter().filter(|w| text.contains(**w)).count() as f32 * weights.word
}

/// Distinct query words of two or more characters, at most `max_words`.
fn query_words(query: &str, max_words: usize) -> Vec<&str> {
    let mut seen = HashSet::new();
    query
        .split(' ')
        .filter(|w| w.chars().count() >= 2 && seen.insert(*w))
        .take(max_words)
        .collect()
}

pub fn substring_search(documents: &[DisplayFields], query: &str, limit: usize, max_words: usize) -> Vec<SearchResult> {
    let query = normalize_text(query);
    if limit == 0 || query.is_empty() {
        return Vec::new();
    }
    let words = query_words(&query, max_words);

    let mut ranked: Vec<(usize, f32)> = documents
        .iter()
        .enumerate()
        .filter_map(|(pos, doc)| {
            let score = field_score(&normalize_text(&doc.title), &query, &words, &TITLE)
                + field_score(&normalize_text(&doc.tags.join(" ")), &query, &words, &TAGS)
                + field_score(&normalize_text(&doc.excerpt), &query, &words, &EXCERPT);
            (score > 0.0).then_some((pos, score))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    debug!(hits = ranked.len(), "substring search");

    ranked.into_iter().map(|(pos, score)| documents[pos].clone().into_result(score)).collect()
}
