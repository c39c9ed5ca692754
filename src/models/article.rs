//! Article domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored article
///
/// The platform `url` is the idempotency key: ingesting a known url is a
/// no-op, never a duplicate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Database ID
    pub id: i64,

    /// Owning feed
    pub feed_id: i64,

    /// Canonical platform URL (unique)
    pub url: String,

    /// Article title
    pub title: String,

    /// Short summary text, if the platform provided one
    pub summary: Option<String>,

    /// Publication time reported by the platform
    pub published_at: DateTime<Utc>,

    /// Whether a note has been written for this article
    pub materialized: bool,

    /// Path of the materialized note, relative to the notes directory
    pub note_path: Option<String>,

    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Create a new unmaterialized article
    pub fn new(
        id: i64,
        feed_id: i64,
        url: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            feed_id,
            url: url.into(),
            title: title.into(),
            summary: None,
            published_at,
            materialized: false,
            note_path: None,
            created_at: Utc::now(),
        }
    }

    /// Set the summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// An article ready for insertion, before a database ID exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    /// Owning feed
    pub feed_id: i64,

    /// Canonical platform URL (unique)
    pub url: String,

    /// Article title
    pub title: String,

    /// Short summary text
    pub summary: Option<String>,

    /// Publication time reported by the platform
    pub published_at: DateTime<Utc>,
}

impl NewArticle {
    /// Create a new insertable article
    pub fn new(
        feed_id: i64,
        url: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id,
            url: url.into(),
            title: title.into(),
            summary: None,
            published_at,
        }
    }

    /// Set the summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}
