//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{Article, Credential, CredentialStatus, Feed, NewArticle};

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // Credential operations
    // =========================================================================

    async fn create_credential(&self, credential: &Credential) -> Result<i64, DbError> {
        let label = credential.label.clone();
        let secret = credential.secret.clone();
        let status = credential.status.to_string();
        let blacklisted_until = credential.blacklisted_until.map(|dt| dt.to_rfc3339());
        let created_at = credential.created_at.to_rfc3339();
        let updated_at = credential.updated_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO credentials
                    (label, secret, status, blacklisted_until, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    rusqlite::params![
                        label,
                        secret,
                        status,
                        blacklisted_until,
                        created_at,
                        updated_at
                    ],
                )?;
                let id = conn.last_insert_rowid();
                Ok(id)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, label, secret, status, blacklisted_until, created_at, updated_at
                    FROM credentials
                    ORDER BY id
                    "#,
                )?;

                let credentials = stmt
                    .query_map([], |row| {
                        Ok(Credential {
                            id: row.get(0)?,
                            label: row.get(1)?,
                            secret: row.get(2)?,
                            status: parse_credential_status(row.get::<_, String>(3)?),
                            blacklisted_until: parse_datetime(row.get::<_, Option<String>>(4)?),
                            created_at: parse_datetime(row.get::<_, Option<String>>(5)?)
                                .unwrap_or_else(Utc::now),
                            updated_at: parse_datetime(row.get::<_, Option<String>>(6)?)
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(credentials)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_credential_status(
        &self,
        id: i64,
        status: CredentialStatus,
        blacklisted_until: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        let status = status.to_string();
        let blacklisted_until = blacklisted_until.map(|dt| dt.to_rfc3339());
        let updated_at = Utc::now().to_rfc3339();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    r#"
                    UPDATE credentials
                    SET status = ?1, blacklisted_until = ?2, updated_at = ?3
                    WHERE id = ?4
                    "#,
                    rusqlite::params![status, blacklisted_until, updated_at, id],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    // =========================================================================
    // Feed operations
    // =========================================================================

    async fn create_feed(&self, feed: &Feed) -> Result<i64, DbError> {
        let name = feed.name.clone();
        let source_id = feed.source_id.clone();
        let credential_id = feed.credential_id;
        let last_sync_at = feed.last_sync_at.map(|dt| dt.to_rfc3339());
        let created_at = feed.created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO feeds
                    (name, source_id, credential_id, last_sync_at, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params![name, source_id, credential_id, last_sync_at, created_at],
                )?;
                let id = conn.last_insert_rowid();
                Ok(id)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_feeds(&self) -> Result<Vec<Feed>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, name, source_id, credential_id, last_sync_at, created_at
                    FROM feeds
                    ORDER BY id
                    "#,
                )?;

                let feeds = stmt
                    .query_map([], |row| {
                        Ok(Feed {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            source_id: row.get(2)?,
                            credential_id: row.get(3)?,
                            last_sync_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                            created_at: parse_datetime(row.get::<_, Option<String>>(5)?)
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(feeds)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_feeds_by_ids(&self, ids: &[i64]) -> Result<Vec<Feed>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();

        self.conn
            .call(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    r#"
                    SELECT id, name, source_id, credential_id, last_sync_at, created_at
                    FROM feeds
                    WHERE id IN ({})
                    ORDER BY id
                    "#,
                    placeholders
                );
                let mut stmt = conn.prepare(&sql)?;

                let feeds = stmt
                    .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                        Ok(Feed {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            source_id: row.get(2)?,
                            credential_id: row.get(3)?,
                            last_sync_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                            created_at: parse_datetime(row.get::<_, Option<String>>(5)?)
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(feeds)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_feeds_needing_sync(&self, cutoff: DateTime<Utc>) -> Result<Vec<Feed>, DbError> {
        let cutoff = cutoff.to_rfc3339();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, name, source_id, credential_id, last_sync_at, created_at
                    FROM feeds
                    WHERE last_sync_at IS NULL OR last_sync_at < ?1
                    ORDER BY id
                    "#,
                )?;

                let feeds = stmt
                    .query_map([&cutoff], |row| {
                        Ok(Feed {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            source_id: row.get(2)?,
                            credential_id: row.get(3)?,
                            last_sync_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                            created_at: parse_datetime(row.get::<_, Option<String>>(5)?)
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(feeds)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_feed_last_sync(&self, id: i64, at: DateTime<Utc>) -> Result<(), DbError> {
        let at = at.to_rfc3339();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE feeds SET last_sync_at = ?1 WHERE id = ?2",
                    rusqlite::params![at, id],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    // =========================================================================
    // Article operations
    // =========================================================================

    async fn insert_articles_if_absent(&self, articles: &[NewArticle]) -> Result<u64, DbError> {
        let articles = articles.to_vec();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0u64;
                {
                    let mut stmt = tx.prepare(
                        r#"
                        INSERT OR IGNORE INTO articles
                        (feed_id, url, title, summary, published_at)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        "#,
                    )?;

                    for article in &articles {
                        inserted += stmt.execute(rusqlite::params![
                            article.feed_id,
                            article.url,
                            article.title,
                            article.summary,
                            article.published_at.to_rfc3339(),
                        ])? as u64;
                    }
                }
                tx.commit()?;

                Ok(inserted)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_unmaterialized_articles(&self) -> Result<Vec<Article>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, feed_id, url, title, summary, published_at,
                           materialized, note_path, created_at
                    FROM articles
                    WHERE materialized = 0
                    ORDER BY feed_id, published_at
                    "#,
                )?;

                let articles = stmt
                    .query_map([], |row| {
                        Ok(Article {
                            id: row.get(0)?,
                            feed_id: row.get(1)?,
                            url: row.get(2)?,
                            title: row.get(3)?,
                            summary: row.get(4)?,
                            published_at: parse_datetime(row.get::<_, Option<String>>(5)?)
                                .unwrap_or_else(Utc::now),
                            materialized: row.get::<_, i64>(6)? != 0,
                            note_path: row.get(7)?,
                            created_at: parse_datetime(row.get::<_, Option<String>>(8)?)
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(articles)
            })
            .await
            .map_err(Into::into)
    }

    async fn mark_articles_materialized(&self, notes: &[(i64, String)]) -> Result<(), DbError> {
        let notes = notes.to_vec();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE articles SET materialized = 1, note_path = ?1 WHERE id = ?2",
                    )?;

                    for (id, path) in &notes {
                        stmt.execute(rusqlite::params![path, id])?;
                    }
                }
                tx.commit()?;

                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn delete_articles_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, DbError> {
        let cutoff = cutoff.to_rfc3339();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let ids = {
                    let mut stmt =
                        tx.prepare("SELECT id FROM articles WHERE published_at < ?1 ORDER BY id")?;
                    let ids = stmt
                        .query_map([&cutoff], |row| row.get(0))?
                        .collect::<Result<Vec<i64>, _>>()?;
                    ids
                };
                tx.execute("DELETE FROM articles WHERE published_at < ?1", [&cutoff])?;
                tx.commit()?;

                Ok(ids)
            })
            .await
            .map_err(Into::into)
    }
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // Try parsing SQLite's datetime format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}

/// Parse a credential status string
///
/// Unknown values map to Disabled so a malformed row never re-enters rotation.
fn parse_credential_status(s: String) -> CredentialStatus {
    s.parse().unwrap_or(CredentialStatus::Disabled)
}
