use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use tracing::{debug, instrument, warn};

use postsearch_core::types::{DisplayFields, Document, Field};
use postsearch_core::{Error, RejectReason};

use crate::analyzer::Analyzer;

/// Position of a document in insertion order; also the ranking tie-break.
pub type DocOrd = u32;

/// `term` occurs `frequency` times in `field` of document `doc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocOrd,
    pub field: Field,
    pub frequency: u32,
}

/// Immutable snapshot: normalized term -> postings, plus the stored display
/// fields of every indexed document in insertion order.
///
/// Postings for a term are ordered by document then field, and terms live in
/// a `BTreeMap`, so building from the same documents always yields an equal index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    documents: Vec<DisplayFields>,
    terms: BTreeMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[DisplayFields] {
        &self.documents
    }

    pub fn document(&self, doc: DocOrd) -> Option<&DisplayFields> {
        self.documents.get(doc as usize)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    /// Terms starting with `prefix`, in lexicographic order (`prefix` itself included).
    pub fn terms_with_prefix<'a>(&'a self, prefix: &str) -> impl Iterator<Item = (&'a str, &'a [Posting])> + 'a {
        let owned = prefix.to_owned();
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(t, _)| t.starts_with(owned.as_str()))
            .map(|(t, p)| (t.as_str(), p.as_slice()))
    }
}

/// A record the builder refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub id: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: Vec<Rejected>,
}

impl BuildReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub index: InvertedIndex,
    pub report: BuildReport,
}

/// Required-field and uniqueness check shared by every strategy: `id` and
/// `title` must be non-blank and `id` must not be in `seen`.
pub fn reject_reason(doc: &Document, seen: &HashSet<String>) -> Option<RejectReason> {
    if doc.id.trim().is_empty() {
        Some(RejectReason::MissingId)
    } else if doc.title.trim().is_empty() {
        Some(RejectReason::MissingTitle)
    } else if seen.contains(&doc.id) {
        Some(RejectReason::DuplicateId)
    } else {
        None
    }
}

/// Incremental builder. The first document with a given id wins; later
/// duplicates are refused.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    analyzer: Analyzer,
    ids: HashSet<String>,
    index: InvertedIndex,
}

impl IndexBuilder {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer, ids: HashSet::new(), index: InvertedIndex::default() }
    }

    pub fn add(&mut self, doc: &Document) -> Result<DocOrd, Error> {
        if let Some(reason) = reject_reason(doc, &self.ids) {
            return Err(Error::MalformedDocument { id: doc.id.clone(), reason });
        }

        let ord = DocOrd::try_from(self.index.documents.len())
            .map_err(|_| Error::InvalidConfig("too many documents for one index".into()))?;
        let tags = doc.tags.join(" ");
        for field in Field::ALL {
            let text = match field {
                Field::Title => doc.title.as_str(),
                Field::Excerpt => doc.excerpt.as_str(),
                Field::Body => doc.body.as_str(),
                Field::Tags => tags.as_str(),
            };
            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in self.analyzer.analyze(text) {
                *counts.entry(token).or_insert(0) += 1;
            }
            for (term, frequency) in counts {
                self.index.terms.entry(term).or_default().push(Posting { doc: ord, field, frequency });
            }
        }
        self.ids.insert(doc.id.clone());
        self.index.documents.push(doc.display_fields());
        Ok(ord)
    }

    pub fn finish(self) -> InvertedIndex {
        self.index
    }
}

/// Build an index over `documents`, skipping and reporting malformed records.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn build_index(documents: &[Document], analyzer: &Analyzer) -> BuildOutcome {
    let mut builder = IndexBuilder::new(analyzer.clone());
    let mut report = BuildReport::default();
    for doc in documents {
        match builder.add(doc) {
            Ok(_) => report.indexed += 1,
            Err(Error::MalformedDocument { id, reason }) => {
                warn!(id = %id, %reason, "skipping malformed document");
                report.skipped.push(Rejected { id, reason });
            }
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping document");
            }
        }
    }
    let index = builder.finish();
    debug!(indexed = report.indexed, skipped = report.skipped_count(), terms = index.term_count(), "index built");
    BuildOutcome { index, report }
}
