//! The two interchangeable ways of answering a query.

use std::collections::HashSet;
use tracing::warn;

use postsearch_core::config::SearchSettings;
use postsearch_core::types::{DisplayFields, Document, SearchResult, StrategyKind};
use postsearch_text::{browse, build_index, reject_reason, substring_search, BuildReport, InvertedIndex, Rejected, Searcher};

/// Read-only query surface shared by every strategy.
pub trait Retriever: Send + Sync {
    fn kind(&self) -> StrategyKind;
    fn documents(&self) -> &[DisplayFields];
    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult>;
}

pub struct IndexedStrategy {
    index: InvertedIndex,
    searcher: Searcher,
}

impl IndexedStrategy {
    pub fn build(documents: &[Document], settings: &SearchSettings) -> (Self, BuildReport) {
        let searcher = Searcher::from_settings(settings);
        let outcome = build_index(documents, searcher.analyzer());
        (Self { index: outcome.index, searcher }, outcome.report)
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }
}

impl Retriever for IndexedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Indexed
    }

    fn documents(&self) -> &[DisplayFields] {
        self.index.documents()
    }

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        self.searcher.search(&self.index, query, limit)
    }
}

pub struct SubstringStrategy {
    documents: Vec<DisplayFields>,
    max_words: usize,
}

impl SubstringStrategy {
    /// Keep the records an index build would keep, without building one.
    pub fn build(documents: &[Document], settings: &SearchSettings) -> (Self, BuildReport) {
        let mut seen = HashSet::new();
        let mut report = BuildReport::default();
        let mut kept = Vec::with_capacity(documents.len());
        for doc in documents {
            if let Some(reason) = reject_reason(doc, &seen) {
                warn!(id = %doc.id, %reason, "skipping malformed document");
                report.skipped.push(Rejected { id: doc.id.clone(), reason });
                continue;
            }
            seen.insert(doc.id.clone());
            kept.push(doc.display_fields());
        }
        report.indexed = kept.len();
        (Self { documents: kept, max_words: settings.max_query_tokens }, report)
    }

    /// Wrap display fields that were already validated, e.g. those of a
    /// previously published engine.
    pub fn from_fields(documents: Vec<DisplayFields>, max_words: usize) -> Self {
        Self { documents, max_words }
    }
}

impl Retriever for SubstringStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Substring
    }

    fn documents(&self) -> &[DisplayFields] {
        &self.documents
    }

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        substring_search(&self.documents, query, limit, self.max_words)
    }
}

/// The published query engine. Callers see one contract whichever
/// strategy is active.
pub enum Engine {
    Indexed(IndexedStrategy),
    Substring(SubstringStrategy),
}

impl Engine {
    pub fn indexed(documents: &[Document], settings: &SearchSettings) -> (Self, BuildReport) {
        let (strategy, report) = IndexedStrategy::build(documents, settings);
        (Engine::Indexed(strategy), report)
    }

    pub fn substring(documents: &[Document], settings: &SearchSettings) -> (Self, BuildReport) {
        let (strategy, report) = SubstringStrategy::build(documents, settings);
        (Engine::Substring(strategy), report)
    }

    fn retriever(&self) -> &dyn Retriever {
        match self {
            Engine::Indexed(s) => s,
            Engine::Substring(s) => s,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.retriever().kind()
    }

    pub fn documents(&self) -> &[DisplayFields] {
        self.retriever().documents()
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        self.retriever().search(query, limit)
    }

    pub fn filter(&self, query: &str, category: &str) -> Vec<DisplayFields> {
        browse::filter(self.documents(), query, category)
    }

    pub fn recent(&self, limit: usize) -> Vec<DisplayFields> {
        browse::recent(self.documents(), limit)
    }

    pub fn related(&self, id: &str, limit: usize) -> Vec<DisplayFields> {
        browse::related(self.documents(), id, limit)
    }

    /// A substring engine over this engine's documents, keeping its word cap.
    pub fn to_substring(&self) -> Engine {
        let max_words = match self {
            Engine::Indexed(s) => s.searcher.options().max_query_tokens,
            Engine::Substring(s) => s.max_words,
        };
        Engine::Substring(SubstringStrategy::from_fields(self.documents().to_vec(), max_words))
    }
}
