//! Note materialization
//!
//! This module defines the NoteStore trait that turns fetched articles into
//! Markdown notes, as well as the outcome types reported back to the sync
//! pipeline. Per-article failures are captured in the outcome so one bad
//! article never aborts a batch.

pub mod filesystem;

pub use filesystem::FilesystemNoteStore;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Article, Feed};

/// One note that exists on disk after a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedNote {
    /// ID of the source article
    pub article_id: i64,
    /// Path of the note on disk
    pub path: String,
}

/// One article whose note could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeFailure {
    /// ID of the source article
    pub article_id: i64,
    /// What went wrong
    pub error: String,
}

/// Result of materializing a batch of articles
#[derive(Debug, Clone, Default)]
pub struct MaterializeOutcome {
    /// Notes written by this batch
    pub created: Vec<MaterializedNote>,
    /// Articles whose note already existed
    pub skipped: Vec<MaterializedNote>,
    /// Articles that failed to materialize
    pub failed: Vec<MaterializeFailure>,
}

impl MaterializeOutcome {
    /// Article-to-path pairs for every article that now has a note on disk
    ///
    /// Covers both freshly created and already existing notes, which is
    /// exactly the set to mark materialized in the database.
    pub fn recorded_paths(&self) -> Vec<(i64, String)> {
        self.created
            .iter()
            .chain(self.skipped.iter())
            .map(|note| (note.article_id, note.path.clone()))
            .collect()
    }
}

/// Trait for note storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Write notes for a batch of articles
    ///
    /// `feeds` maps feed IDs to their feed for rendering context. An error
    /// return means the whole batch was unusable; per-article problems are
    /// reported through the outcome instead.
    async fn materialize_batch(
        &self,
        articles: &[Article],
        feeds: &HashMap<i64, Feed>,
    ) -> Result<MaterializeOutcome, StoreError>;

    /// Delete the notes belonging to the given article IDs
    ///
    /// Missing notes are not an error. Returns the number of notes deleted.
    async fn delete_by_article_ids(&self, article_ids: &[i64]) -> Result<u64, StoreError>;
}
