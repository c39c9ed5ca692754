//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use feedstash::api::HttpContentApi;
use feedstash::config::Config;
use feedstash::database::{Database, SqliteDatabase};
use feedstash::models::{Credential, CredentialStatus, Feed};
use feedstash::notes::FilesystemNoteStore;
use feedstash::sync::SyncEngine;

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::new(":memory:")
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a temporary directory for note output
pub fn create_notes_dir() -> TempDir {
    TempDir::new().expect("Failed to create notes directory")
}

/// Build a config pointed at the given mock platform URL and notes directory
///
/// Delays are zeroed and retries cut to a single attempt so failure tests
/// finish immediately.
pub fn test_config(base_url: &str, notes_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_secs = 5;
    config.api.page_delay_secs = 0;
    config.retry.max_attempts = 1;
    config.retry.base_delay_ms = 1;
    config.notes.dir = notes_dir.to_string_lossy().to_string();
    config
}

/// Build an engine from real components wired to the config
pub async fn create_test_engine(
    db: Arc<SqliteDatabase>,
    config: &Config,
) -> SyncEngine<SqliteDatabase, HttpContentApi> {
    let api = Arc::new(HttpContentApi::new(&config.api));
    let notes = Arc::new(
        FilesystemNoteStore::new_with_init(&config.notes.dir)
            .await
            .expect("Failed to initialize note store"),
    );
    SyncEngine::new(db, api, notes, config)
}

/// Seed an active credential and return its ID
pub async fn seed_credential(db: &SqliteDatabase, label: &str, secret: &str) -> i64 {
    db.create_credential(&Credential::new(0, label, secret))
        .await
        .expect("Failed to seed credential")
}

/// Seed a credential in the given status and return its ID
pub async fn seed_credential_with_status(
    db: &SqliteDatabase,
    label: &str,
    secret: &str,
    status: CredentialStatus,
    blacklisted_until: Option<DateTime<Utc>>,
) -> i64 {
    let mut credential = Credential::new(0, label, secret).with_status(status);
    if let Some(until) = blacklisted_until {
        credential = credential.with_blacklisted_until(until);
    }
    db.create_credential(&credential)
        .await
        .expect("Failed to seed credential")
}

/// Seed a feed and return its ID
pub async fn seed_feed(
    db: &SqliteDatabase,
    name: &str,
    source_id: &str,
    credential_id: i64,
) -> i64 {
    db.create_feed(&Feed::new(0, name, source_id, credential_id))
        .await
        .expect("Failed to seed feed")
}

/// Build the JSON body for one article page
pub fn article_page_body(
    articles: &[(&str, &str, DateTime<Utc>)],
    has_more: bool,
) -> serde_json::Value {
    let articles: Vec<serde_json::Value> = articles
        .iter()
        .map(|(url, title, published_at)| {
            serde_json::json!({
                "url": url,
                "title": title,
                "published_at": published_at.to_rfc3339(),
            })
        })
        .collect();

    serde_json::json!({ "articles": articles, "has_more": has_more })
}
