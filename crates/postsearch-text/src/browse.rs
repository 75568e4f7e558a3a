//! Unranked listing helpers used by browse pages: filter, recent, related.

use std::cmp::Ordering;

use postsearch_core::dates::parse_date;
use postsearch_core::types::DisplayFields;

use crate::analyzer::normalize_text;

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// Documents whose title, excerpt or any tag contains `query` (case-insensitive)
/// AND that carry `category` as a tag. An empty query or an empty/`all`
/// category does not filter. Matches come back newest first; undated ones
/// trail in their original order.
pub fn filter(documents: &[DisplayFields], query: &str, category: &str) -> Vec<DisplayFields> {
    let query = normalize_text(query);
    let category = category.trim();
    let any_category = category.is_empty() || category.eq_ignore_ascii_case(ALL_CATEGORIES);

    let mut matched: Vec<&DisplayFields> = documents
        .iter()
        .filter(|doc| {
            query.is_empty()
                || normalize_text(&doc.title).contains(&query)
                || normalize_text(&doc.excerpt).contains(&query)
                || doc.tags.iter().any(|t| normalize_text(t).contains(&query))
        })
        .filter(|doc| any_category || doc.tags.iter().any(|t| t == category))
        .collect();
    matched.sort_by(|a, b| newest_first(a, b));
    matched.into_iter().cloned().collect()
}

fn newest_first(a: &DisplayFields, b: &DisplayFields) -> Ordering {
    let da = a.published_at.as_deref().and_then(parse_date);
    let db = b.published_at.as_deref().and_then(parse_date);
    match (da, db) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Newest documents first; undated ones trail in their original order.
pub fn recent(documents: &[DisplayFields], limit: usize) -> Vec<DisplayFields> {
    let mut docs: Vec<&DisplayFields> = documents.iter().collect();
    docs.sort_by(|a, b| newest_first(a, b));
    docs.into_iter().take(limit).cloned().collect()
}

/// Other documents ranked by shared tags, newest first among equals.
/// Unknown ids yield nothing.
pub fn related(documents: &[DisplayFields], id: &str, limit: usize) -> Vec<DisplayFields> {
    let Some(current) = documents.iter().find(|d| d.id == id) else {
        return Vec::new();
    };
    let mut scored: Vec<(usize, &DisplayFields)> = documents
        .iter()
        .filter(|d| d.id != id)
        .map(|d| (d.tags.iter().filter(|t| current.tags.contains(*t)).count(), d))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| newest_first(a.1, b.1)));
    scored.into_iter().take(limit).map(|(_, d)| d.clone()).collect()
}
