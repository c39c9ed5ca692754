//! Database layer for feedstash
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::{Article, Credential, CredentialStatus, Feed, NewArticle};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // Credential operations
    // =========================================================================

    /// Insert a new API credential
    ///
    /// Returns the ID of the inserted credential
    async fn create_credential(&self, credential: &Credential) -> Result<i64, DbError>;

    /// List all credentials in insertion order
    async fn list_credentials(&self) -> Result<Vec<Credential>, DbError>;

    /// Update a credential's lifecycle status
    ///
    /// `blacklisted_until` is stored as given, so passing None clears it.
    async fn update_credential_status(
        &self,
        id: i64,
        status: CredentialStatus,
        blacklisted_until: Option<DateTime<Utc>>,
    ) -> Result<(), DbError>;

    // =========================================================================
    // Feed operations
    // =========================================================================

    /// Insert a new feed subscription
    ///
    /// Returns the ID of the inserted feed
    async fn create_feed(&self, feed: &Feed) -> Result<i64, DbError>;

    /// List all feeds in insertion order
    async fn list_feeds(&self) -> Result<Vec<Feed>, DbError>;

    /// Get the feeds matching the given IDs
    ///
    /// IDs with no matching feed are silently skipped.
    async fn get_feeds_by_ids(&self, ids: &[i64]) -> Result<Vec<Feed>, DbError>;

    /// Get feeds never synced or last synced before the cutoff
    async fn get_feeds_needing_sync(&self, cutoff: DateTime<Utc>) -> Result<Vec<Feed>, DbError>;

    /// Advance a feed's last sync timestamp
    async fn update_feed_last_sync(&self, id: i64, at: DateTime<Utc>) -> Result<(), DbError>;

    // =========================================================================
    // Article operations
    // =========================================================================

    /// Insert articles, skipping any whose url already exists
    ///
    /// The whole batch runs in one transaction. Returns the number of
    /// articles actually inserted.
    async fn insert_articles_if_absent(&self, articles: &[NewArticle]) -> Result<u64, DbError>;

    /// Get all articles not yet materialized as notes
    async fn get_unmaterialized_articles(&self) -> Result<Vec<Article>, DbError>;

    /// Record the note path for materialized articles
    async fn mark_articles_materialized(&self, notes: &[(i64, String)]) -> Result<(), DbError>;

    /// Delete articles published before the cutoff
    ///
    /// Returns the IDs of the deleted articles
    async fn delete_articles_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, DbError>;
}
