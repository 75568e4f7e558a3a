//! The prebuilt search artifact: a versioned JSON document list generated at
//! build time and served from static storage.
//!
//! Shape: `{ "documents": [...], "updatedAt": "...", "version": "1.0.0" }`.
//! Loaders look at `version` before touching `documents`; an unknown major
//! version is reported as [`Error::ArtifactVersion`] so the caller can rebuild
//! from the raw content source instead.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::dates::format_date;
use crate::error::{Error, Result};
use crate::traits::ArtifactSource;
use crate::types::Document;

pub const ARTIFACT_VERSION: &str = "1.0.0";
pub const SUPPORTED_MAJOR: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArtifact {
    pub documents: Vec<ArtifactDocument>,
    pub updated_at: String,
    pub version: String,
}

/// Missing fields deserialize as empty so the index builder can reject the
/// record individually instead of failing the whole artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtifactDocument {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl SearchArtifact {
    pub fn from_documents(documents: &[Document], updated_at: DateTime<Utc>) -> Self {
        let documents = documents
            .iter()
            .map(|d| ArtifactDocument {
                id: d.id.clone(),
                slug: if d.slug.is_empty() { d.id.clone() } else { d.slug.clone() },
                title: d.title.clone(),
                excerpt: d.excerpt.clone(),
                published_at: d.published_at.clone(),
                tags: d.tags.clone(),
                image: d.image.clone(),
                body: if d.body.is_empty() { None } else { Some(d.body.clone()) },
            })
            .collect();
        Self {
            documents,
            updated_at: updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: ARTIFACT_VERSION.to_string(),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::Artifact(e.to_string()))?;
        let version = value.get("version").and_then(serde_json::Value::as_str).unwrap_or_default();
        check_version(version)?;
        serde_json::from_value(value).map_err(|e| Error::Artifact(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Artifact(e.to_string()))
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
            .into_iter()
            .map(|a| Document {
                formatted_date: a.published_at.as_deref().map(format_date).unwrap_or_default(),
                id: a.id,
                title: a.title,
                excerpt: a.excerpt,
                body: a.body.unwrap_or_default(),
                tags: a.tags,
                slug: a.slug,
                published_at: a.published_at,
                image: a.image,
            })
            .collect()
    }
}

pub fn check_version(version: &str) -> Result<()> {
    let major = version.trim().split('.').next().and_then(|m| m.parse::<u64>().ok());
    if major == Some(SUPPORTED_MAJOR) {
        Ok(())
    } else {
        Err(Error::ArtifactVersion { found: version.to_string(), supported: SUPPORTED_MAJOR })
    }
}

/// Artifact stored as a JSON file (e.g. `public/search-index.json`).
#[derive(Debug, Clone)]
pub struct JsonFileArtifact {
    path: PathBuf,
}

impl JsonFileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArtifactSource for JsonFileArtifact {
    async fn load(&self) -> Result<SearchArtifact> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::Artifact(format!("{}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "read search artifact");
        SearchArtifact::from_json(&bytes)
    }
}
