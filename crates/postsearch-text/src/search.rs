//! Ranked, typo-tolerant search over an [`InvertedIndex`].
//!
//! Each query token expands to the index terms that equal it, start with it,
//! or lie within the fuzzy edit budget. A document scores
//! `Σ frequency × boost(field)` over every posting of every matched term,
//! summed across query tokens. Ties keep insertion order.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

use postsearch_core::config::SearchSettings;
use postsearch_core::types::{FieldBoosts, SearchResult};

use crate::analyzer::Analyzer;
use crate::fuzzy::{max_edits, within_edits};
use crate::index::{DocOrd, InvertedIndex};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub max_query_tokens: usize,
    pub fuzzy_fraction: f32,
    pub fuzzy_max_edits: usize,
    pub prefix: bool,
    pub boosts: FieldBoosts,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&SearchSettings::default())
    }
}

impl From<&SearchSettings> for QueryOptions {
    fn from(s: &SearchSettings) -> Self {
        Self {
            max_query_tokens: s.max_query_tokens,
            fuzzy_fraction: s.fuzzy_fraction,
            fuzzy_max_edits: s.fuzzy_max_edits,
            prefix: s.prefix,
            boosts: s.boosts,
        }
    }
}

/// How an index term was reached from a query token. Ordered by strength;
/// a term reachable several ways keeps the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Prefix,
    Fuzzy,
}

#[derive(Debug, Clone, Default)]
pub struct Searcher {
    analyzer: Analyzer,
    options: QueryOptions,
}

impl Searcher {
    pub fn new(analyzer: Analyzer, options: QueryOptions) -> Self {
        Self { analyzer, options }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(Analyzer::new(settings.min_token_len), QueryOptions::from(settings))
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Query tokens actually considered: analyzed, capped, deduplicated.
    pub fn query_tokens(&self, query: &str) -> Vec<String> {
        let mut tokens = self.analyzer.analyze_limited(query, self.options.max_query_tokens);
        let mut seen = HashSet::new();
        tokens.retain(|t| seen.insert(t.clone()));
        tokens
    }

    /// Index terms matched by one query token.
    pub fn expand<'i>(&self, index: &'i InvertedIndex, token: &str) -> BTreeMap<&'i str, MatchKind> {
        let mut matched: BTreeMap<&'i str, MatchKind> = BTreeMap::new();
        let mut note = |term: &'i str, kind: MatchKind| {
            matched.entry(term).and_modify(|k| *k = (*k).min(kind)).or_insert(kind);
        };

        if self.options.prefix {
            for (term, _) in index.terms_with_prefix(token) {
                note(term, if term == token { MatchKind::Exact } else { MatchKind::Prefix });
            }
        } else if let Some((term, _)) = index.terms_with_prefix(token).next().filter(|(t, _)| *t == token) {
            note(term, MatchKind::Exact);
        }

        let budget = max_edits(token.chars().count(), self.options.fuzzy_fraction, self.options.fuzzy_max_edits);
        if budget > 0 {
            for (term, _) in index.terms() {
                if term != token && within_edits(token, term, budget) {
                    note(term, MatchKind::Fuzzy);
                }
            }
        }
        matched
    }

    #[instrument(skip(self, index), fields(docs = index.len()))]
    pub fn search(&self, index: &InvertedIndex, query: &str, limit: usize) -> Vec<SearchResult> {
        if limit == 0 || index.is_empty() {
            return Vec::new();
        }
        let tokens = self.query_tokens(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; index.len()];
        let mut hit = vec![false; index.len()];
        for token in &tokens {
            for term in self.expand(index, token).into_keys() {
                let Some(postings) = index.postings(term) else { continue };
                for p in postings {
                    let slot = p.doc as usize;
                    scores[slot] += p.frequency as f32 * self.options.boosts.get(p.field);
                    hit[slot] = true;
                }
            }
        }

        let mut ranked: Vec<(DocOrd, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(slot, _)| hit[*slot])
            .filter_map(|(slot, score)| DocOrd::try_from(slot).ok().map(|ord| (ord, score)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        debug!(tokens = tokens.len(), hits = ranked.len(), "indexed search");

        ranked
            .into_iter()
            .filter_map(|(ord, score)| index.document(ord).map(|d| d.clone().into_result(score)))
            .collect()
    }
}
