//! Content sources: a fixed in-memory list and a directory of markdown posts.
//!
//! Markdown posts carry YAML front matter between `---` lines, or TOML
//! between `+++` lines:
//!
//! ```text
//! ---
//! title: "Echo Dot Review"
//! date: "2024-03-01"
//! excerpt: "Is the smallest Echo worth it?"
//! tags: ["smart-home", "audio"]
//! ---
//! Body text...
//! ```
//!
//! The document id is the file stem. Posts come back newest first, then by
//! title, which is also the tie-break order used when ranking.

use async_trait::async_trait;
use figment::{
    providers::{Format, Toml, Yaml},
    Figment,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

use crate::dates::{format_date, parse_date};
use crate::error::{Error, Result};
use crate::traits::ContentSource;
use crate::types::Document;

/// A fixed document list, e.g. already fetched from a CMS.
#[derive(Debug, Clone, Default)]
pub struct StaticDocuments {
    documents: Vec<Document>,
}

impl StaticDocuments {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl ContentSource for StaticDocuments {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: String,
    slug: Option<String>,
    date: Option<String>,
    excerpt: String,
    tags: Vec<String>,
    image: Option<String>,
}

/// Directory of `*.md` posts.
#[derive(Debug, Clone)]
pub struct MarkdownDirectory {
    root: PathBuf,
}

impl MarkdownDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Blocking read of every post under the root.
    pub fn read_all(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(Error::ContentSource(format!("{} is not a directory", self.root.display())));
        }
        let files = list_markdown_files(&self.root)?;
        if files.is_empty() {
            info!(root = %self.root.display(), "no markdown posts found");
        }
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            match fs::read_to_string(path) {
                Ok(raw) => documents.push(parse_post(path, &raw)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable post"),
            }
        }
        documents.sort_by(newest_first);
        debug!(root = %self.root.display(), posts = documents.len(), "read markdown posts");
        Ok(documents)
    }
}

#[async_trait]
impl ContentSource for MarkdownDirectory {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        let dir = self.clone();
        tokio::task::spawn_blocking(move || dir.read_all())
            .await
            .map_err(|e| Error::ContentSource(format!("content reader task failed: {}", e)))?
    }
}

fn list_markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|e| Error::ContentSource(e.to_string()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrontMatterFormat {
    Yaml,
    Toml,
}

/// Split a post into front matter and body. Posts without front matter keep
/// their whole text as body and end up with an empty title.
fn split_front_matter(raw: &str) -> (Option<(FrontMatterFormat, &str)>, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    for (fence, format) in [("---", FrontMatterFormat::Yaml), ("+++", FrontMatterFormat::Toml)] {
        let Some(rest) = raw.strip_prefix(fence) else { continue };
        let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else { continue };
        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == fence {
                return (Some((format, &rest[..offset])), &rest[offset + line.len()..]);
            }
            offset += line.len();
        }
    }
    (None, raw)
}

fn parse_post(path: &Path, raw: &str) -> Document {
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let (front, body) = split_front_matter(raw);
    let meta = match front {
        Some((format, front)) => {
            let figment = match format {
                FrontMatterFormat::Yaml => Figment::from(Yaml::string(front)),
                FrontMatterFormat::Toml => Figment::from(Toml::string(front)),
            };
            figment.extract::<FrontMatter>().unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid front matter");
                FrontMatter::default()
            })
        }
        None => FrontMatter::default(),
    };
    Document {
        slug: meta.slug.unwrap_or_else(|| stem.clone()),
        id: stem,
        title: meta.title,
        excerpt: meta.excerpt,
        body: body.trim().to_string(),
        tags: meta.tags,
        formatted_date: meta.date.as_deref().map(format_date).unwrap_or_default(),
        published_at: meta.date,
        image: meta.image,
    }
}

fn newest_first(a: &Document, b: &Document) -> Ordering {
    let da = a.published_at.as_deref().and_then(parse_date);
    let db = b.published_at.as_deref().and_then(parse_date);
    match (da, db) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.title.cmp(&b.title))
}

/// Stable hash of a document list, used to skip rebuilds when nothing changed.
pub fn fingerprint(documents: &[Document]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    documents.len().hash(&mut hasher);
    for doc in documents {
        doc.hash(&mut hasher);
    }
    hasher.finish()
}
