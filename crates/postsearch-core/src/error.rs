use thiserror::Error;

/// Why a single record was refused by the index builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingId,
    MissingTitle,
    DuplicateId,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingId => f.write_str("missing id"),
            RejectReason::MissingTitle => f.write_str("missing title"),
            RejectReason::DuplicateId => f.write_str("duplicate id"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Content source unavailable: {0}")]
    ContentSource(String),

    #[error("Malformed document '{id}': {reason}")]
    MalformedDocument { id: String, reason: RejectReason },

    #[error("Unsupported index artifact version '{found}' (supported major: {supported})")]
    ArtifactVersion { found: String, supported: u64 },

    #[error("Index artifact unreadable: {0}")]
    Artifact(String),

    #[error("Timed out after {after_ms}ms while {operation}")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search is unavailable: no index and no fallback documents")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
