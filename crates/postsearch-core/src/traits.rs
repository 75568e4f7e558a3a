use async_trait::async_trait;

use crate::artifact::SearchArtifact;
use crate::types::Document;

/// Anything that can list the full set of documents: a content directory,
/// a remote CMS, or a fixed list.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_documents(&self) -> crate::Result<Vec<Document>>;
}

/// Storage holding a prebuilt, versioned search artifact.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn load(&self) -> crate::Result<SearchArtifact>;
}
