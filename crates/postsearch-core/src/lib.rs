//! postsearch-core
//!
//! Data model, error taxonomy, configuration, content sources and the
//! versioned search artifact shared by the text engine and the service.

pub mod artifact;
pub mod config;
pub mod content;
pub mod dates;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, RejectReason, Result};
