use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Tokens of this many bytes or more are dropped before indexing, so such a
/// word is never searchable through the index. They are almost always URLs
/// or hashes.
pub const MAX_TOKEN_BYTES: usize = 64;
pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

/// Splits on every non-alphanumeric character, which also strips punctuation
/// and markdown markers, then lowercases. Tokens shorter than
/// `min_token_len` characters are dropped.
#[derive(Clone)]
pub struct Analyzer {
    inner: TextAnalyzer,
    min_token_len: usize,
}

impl Analyzer {
    pub fn new(min_token_len: usize) -> Self {
        let inner = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
            .filter(LowerCaser)
            .build();
        Self { inner, min_token_len }
    }

    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.analyze_limited(text, usize::MAX)
    }

    /// Like [`analyze`](Self::analyze) but stops after `max_tokens` kept tokens.
    pub fn analyze_limited(&self, text: &str, max_tokens: usize) -> Vec<String> {
        let mut analyzer = self.inner.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while tokens.len() < max_tokens && stream.advance() {
            let token = &stream.token().text;
            if token.chars().count() >= self.min_token_len {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TOKEN_LEN)
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("min_token_len", &self.min_token_len).finish_non_exhaustive()
    }
}

/// Lowercase and collapse whitespace runs to single spaces. The substring
/// strategy matches on this form so it agrees with the analyzer on case.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}
