//! postsearch-text
//!
//! In-memory full-text search: tantivy-based analysis, an inverted index with
//! per-field postings, ranked prefix/fuzzy search, and the substring and
//! browse helpers used when no index is available.

pub mod analyzer;
pub mod browse;
pub mod fuzzy;
pub mod index;
pub mod search;
pub mod substring;

pub use analyzer::{normalize_text, Analyzer};
pub use index::{build_index, reject_reason, BuildOutcome, BuildReport, IndexBuilder, InvertedIndex, Posting, Rejected};
pub use search::{MatchKind, QueryOptions, Searcher};
pub use substring::substring_search;
