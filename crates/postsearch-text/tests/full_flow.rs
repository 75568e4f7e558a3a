use postsearch_core::types::Document;
use postsearch_text::{build_index, substring_search, Analyzer, InvertedIndex, Searcher};
use proptest::prelude::*;

fn blog() -> Vec<Document> {
    vec![
        Document::new("a", "RØDE Wireless ME Review").with_tags(["audio"]),
        Document::new("b", "Echo Dot Review").with_tags(["smart-home"]),
    ]
}

fn index(docs: &[Document]) -> InvertedIndex {
    build_index(docs, &Analyzer::default()).index
}

fn ids(index: &InvertedIndex, query: &str, limit: usize) -> Vec<String> {
    Searcher::default().search(index, query, limit).into_iter().map(|r| r.id).collect()
}

#[test]
fn wireless_mic_finds_the_rode_review_first() {
    let idx = index(&blog());
    let found = ids(&idx, "wireless mic", 10);
    assert_eq!(found.first().map(String::as_str), Some("a"));
}

#[test]
fn empty_query_returns_nothing() {
    assert!(ids(&index(&blog()), "", 10).is_empty());
}

#[test]
fn unknown_terms_return_nothing() {
    assert!(ids(&index(&blog()), "xyznonexistent", 10).is_empty());
}

#[test]
fn transposed_letters_still_match_tags() {
    assert_eq!(ids(&index(&blog()), "audoi", 10), vec!["a"]);
}

#[test]
fn prefix_matches_partial_words() {
    assert_eq!(ids(&index(&blog()), "wire", 10), vec!["a"]);
}

#[test]
fn results_carry_display_fields_but_no_body() {
    let docs = vec![Document::new("echo-dot", "Echo Dot Review")
        .with_excerpt("Small smart speaker")
        .with_body("secret body text only for indexing")
        .with_published_at("2024-03-01")
        .with_image("/images/posts/echo-dot.webp")];
    let results = Searcher::default().search(&index(&docs), "secret", 10);
    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.slug, "echo-dot");
    assert_eq!(hit.formatted_date, "March 1, 2024");
    assert_eq!(hit.image.as_deref(), Some("/images/posts/echo-dot.webp"));
    let json = serde_json::to_string(hit).expect("json");
    assert!(!json.contains("secret body"));
}

fn arb_doc() -> impl Strategy<Value = Document> {
    (
        "[a-z]{1,6}",
        "[a-z]{2,8}( [a-z]{2,8}){0,4}",
        "[a-z]{2,8}( [a-z]{2,8}){0,6}",
        prop::collection::vec("[a-z]{2,6}", 0..3),
    )
        .prop_map(|(id, title, excerpt, tags)| Document::new(id, title).with_excerpt(excerpt).with_tags(tags))
}

proptest! {
    #[test]
    fn results_are_bounded_and_come_from_the_corpus(
        docs in prop::collection::vec(arb_doc(), 0..12),
        query in "[a-z]{1,8}( [a-z]{1,8}){0,3}",
        limit in 0usize..6,
    ) {
        let idx = index(&docs);
        let results = Searcher::default().search(&idx, &query, limit);
        prop_assert!(results.len() <= limit);
        for r in &results {
            prop_assert!(docs.iter().any(|d| d.id == r.id));
        }
        let mut seen = std::collections::HashSet::new();
        prop_assert!(results.iter().all(|r| seen.insert(r.id.clone())));
    }

    #[test]
    fn rebuilding_yields_identical_results(
        docs in prop::collection::vec(arb_doc(), 0..12),
        query in "[a-z]{1,8}( [a-z]{1,8}){0,3}",
    ) {
        let first = Searcher::default().search(&index(&docs), &query, 10);
        let second = Searcher::default().search(&index(&docs), &query, 10);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn title_match_scores_at_least_excerpt_match(
        word in "[a-z]{3,8}",
        filler in "[0-9]{3,6}",
    ) {
        let docs = vec![
            Document::new("excerpt", filler.clone()).with_excerpt(word.clone()),
            Document::new("title", word.clone()).with_excerpt(filler.clone()),
        ];
        let results = Searcher::default().search(&index(&docs), &word, 10);
        let score = |id: &str| results.iter().find(|r| r.id == id).map(|r| r.score);
        let title = score("title");
        let excerpt = score("excerpt");
        prop_assert!(title.is_some() && excerpt.is_some());
        prop_assert!(title >= excerpt);
    }

    #[test]
    fn substring_fallback_includes_every_literal_hit(
        docs in prop::collection::vec(arb_doc(), 1..10),
        pick in any::<prop::sample::Index>(),
        start in 0usize..40,
        len in 1usize..12,
    ) {
        let target = &docs[pick.index(docs.len())];
        let text = if start % 2 == 0 { &target.title } else { &target.excerpt };
        let from = start.min(text.len().saturating_sub(1));
        let to = (from + len).min(text.len());
        let query = &text[from..to];
        prop_assume!(!query.trim().is_empty());

        let fields: Vec<_> = docs.iter().map(Document::display_fields).collect();
        let results = substring_search(&fields, query, fields.len(), 32);
        for (doc, f) in docs.iter().zip(&fields) {
            let literal = doc.title.contains(query) || doc.excerpt.contains(query);
            if literal {
                prop_assert!(results.iter().any(|r| r.id == f.id), "missing {} for {:?}", f.id, query);
            }
        }
    }
}
