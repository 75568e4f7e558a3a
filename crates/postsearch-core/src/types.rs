//! Domain types shared by the index, the strategies and the content sources.

use serde::{Deserialize, Serialize};

pub type DocId = String;

/// One searchable content record (a blog post).
///
/// - `id`: unique primary key, the post slug
/// - `title`/`excerpt`/`body`/`tags`: analyzed fields (`body` is never returned)
/// - `slug`/`published_at`/`formatted_date`/`image`: display data stored verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub published_at: Option<String>,
    pub formatted_date: String,
    pub image: Option<String>,
}

impl Document {
    /// Minimal record with an id and a title; everything else empty.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), ..Self::default() }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_published_at(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.formatted_date = crate::dates::format_date(&raw);
        self.published_at = Some(raw);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// The fields kept for rendering results. An empty slug falls back to the id.
    pub fn display_fields(&self) -> DisplayFields {
        let slug = if self.slug.trim().is_empty() { self.id.clone() } else { self.slug.clone() };
        DisplayFields {
            id: self.id.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            slug,
            formatted_date: self.formatted_date.clone(),
            tags: self.tags.clone(),
            image: self.image.clone(),
            published_at: self.published_at.clone(),
        }
    }
}

/// Stored, never-analyzed copy of a document used to render listings and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub id: DocId,
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub formatted_date: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl DisplayFields {
    pub fn into_result(self, score: f32) -> SearchResult {
        SearchResult {
            id: self.id,
            title: self.title,
            excerpt: self.excerpt,
            slug: self.slug,
            formatted_date: self.formatted_date,
            tags: self.tags,
            image: self.image,
            score,
        }
    }
}

/// A ranked hit. `score` is strategy-specific but higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: DocId,
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub formatted_date: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub score: f32,
}

/// Indexed fields, in the order postings are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Excerpt,
    Body,
    Tags,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Excerpt, Field::Body, Field::Tags];
}

/// Query-time multipliers per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldBoosts {
    pub title: f32,
    pub tags: f32,
    pub excerpt: f32,
    pub body: f32,
}

impl Default for FieldBoosts {
    fn default() -> Self {
        Self { title: 3.0, tags: 2.0, excerpt: 1.5, body: 1.0 }
    }
}

impl FieldBoosts {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title,
            Field::Tags => self.tags,
            Field::Excerpt => self.excerpt,
            Field::Body => self.body,
        }
    }
}

/// Which retrieval strategy produced a set of results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StrategyKind {
    Indexed,
    Substring,
}
