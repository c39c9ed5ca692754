//! Sync run orchestration
//!
//! A run walks three phases in order: refresh feeds from the platform,
//! materialize notes for new articles, clean up expired data. Only one run
//! may be in flight per engine; concurrent requests are rejected instead of
//! queued. Failures are scoped as narrowly as possible so one bad feed or
//! article never takes down a whole run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::{ContentApi, FetchedArticle, RetryManager};
use crate::config::{Config, SyncConfig};
use crate::database::Database;
use crate::error::{ApiError, AppError, DbError, FeedError, SyncError};
use crate::models::{Credential, Feed, NewArticle, SyncReport};
use crate::notes::NoteStore;
use crate::pool::CredentialPool;
use crate::sync::scheduler::SyncTask;

/// Per-run overrides
///
/// Every `None` falls back to the configured behavior, so a default value
/// requests a plain scheduled-style run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Refresh exactly these feeds instead of the stale ones
    pub feed_ids: Option<Vec<i64>>,

    /// Override the staleness threshold; zero selects every feed
    pub stale_threshold_hours: Option<u32>,

    /// Override whether the materialize phase runs
    pub materialize: Option<bool>,
}

/// Drops the busy flag when a run ends, however it ends
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates sync runs against the content platform
pub struct SyncEngine<D: Database, C: ContentApi> {
    db: Arc<D>,
    api: Arc<C>,
    pool: CredentialPool<D>,
    retry: RetryManager,
    notes: Arc<dyn NoteStore>,
    sync_config: SyncConfig,
    page_delay: Duration,
    running: AtomicBool,
}

impl<D: Database, C: ContentApi> SyncEngine<D, C> {
    /// Create a new engine from the application configuration
    pub fn new(db: Arc<D>, api: Arc<C>, notes: Arc<dyn NoteStore>, config: &Config) -> Self {
        Self {
            pool: CredentialPool::new(db.clone(), config.pool.clone()),
            retry: RetryManager::new(config.retry.clone()),
            page_delay: Duration::from_secs(config.api.page_delay_secs),
            sync_config: config.sync.clone(),
            db,
            api,
            notes,
            running: AtomicBool::new(false),
        }
    }

    /// Execute one full sync run
    ///
    /// Returns [`SyncError::AlreadyRunning`] without doing any work when a
    /// run is already in flight. Per-feed and per-article failures land in
    /// the report; an `Err` here means the run could not proceed at all.
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport, SyncError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Sync requested while another run is in progress");
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunGuard {
            running: &self.running,
        };

        info!("Starting sync run");
        let mut report = SyncReport::new();

        self.refresh_feeds(&options, &mut report).await?;

        if options.materialize.unwrap_or(self.sync_config.materialize) {
            self.materialize_notes(&mut report).await?;
        } else {
            debug!("Materialize phase disabled for this run");
        }

        self.cleanup(&mut report).await;

        info!(%report, "Sync run finished");
        Ok(report)
    }

    // =========================================================================
    // Refresh phase
    // =========================================================================

    async fn refresh_feeds(
        &self,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let feeds = self.select_feeds(options).await?;

        if feeds.is_empty() {
            info!("No feeds due for refresh");
            return Ok(());
        }

        info!(feeds = feeds.len(), "Refreshing feeds");

        for feed in &feeds {
            match self.refresh_one_feed(feed).await {
                Ok(new_articles) => {
                    info!(feed = %feed.name, new_articles, "Feed refreshed");
                    report.record_feed_success(new_articles);
                }
                Err(err) => {
                    warn!(feed = %feed.name, error = %err, "Feed refresh failed");
                    report.record_feed_failure(&feed.name, err);
                }
            }
        }

        Ok(())
    }

    async fn select_feeds(&self, options: &SyncOptions) -> Result<Vec<Feed>, DbError> {
        if let Some(ids) = &options.feed_ids {
            return self.db.get_feeds_by_ids(ids).await;
        }

        let hours = options
            .stale_threshold_hours
            .unwrap_or(self.sync_config.stale_threshold_hours);
        let cutoff = Utc::now() - chrono::Duration::hours(hours as i64);
        self.db.get_feeds_needing_sync(cutoff).await
    }

    async fn refresh_one_feed(&self, feed: &Feed) -> Result<u64, FeedError> {
        let credential = self
            .pool
            .acquire_available()
            .await?
            .ok_or(FeedError::NoCredential)?;

        debug!(feed = %feed.name, credential = %credential.label, "Acquired credential");

        let fetched = match self.fetch_all_pages(feed, &credential).await {
            Ok(fetched) => fetched,
            Err(err) => {
                // Auth and throttle rejections are recorded onto the
                // credential so the next feed picks a healthy one.
                self.pool.record_api_error(credential.id, &err).await?;
                return Err(err.into());
            }
        };

        let cutoff =
            Utc::now() - chrono::Duration::days(self.sync_config.freshness_window_days as i64);
        let fresh: Vec<NewArticle> = fetched
            .into_iter()
            .filter(|article| article.published_at >= cutoff)
            .map(|article| {
                let mut row = NewArticle::new(
                    feed.id,
                    article.url,
                    article.title,
                    article.published_at,
                );
                if let Some(summary) = article.summary {
                    row = row.with_summary(summary);
                }
                row
            })
            .collect();

        let inserted = if fresh.is_empty() {
            0
        } else {
            self.db.insert_articles_if_absent(&fresh).await?
        };

        self.db.update_feed_last_sync(feed.id, Utc::now()).await?;

        Ok(inserted)
    }

    async fn fetch_all_pages(
        &self,
        feed: &Feed,
        credential: &Credential,
    ) -> Result<Vec<FetchedArticle>, ApiError> {
        let max_items = self.sync_config.max_articles_per_feed as usize;
        let mut collected: Vec<FetchedArticle> = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .retry
                .execute(|| self.api.fetch_articles(&feed.source_id, &credential.secret, page))
                .await?;

            let page_len = response.articles.len();
            collected.extend(response.articles);

            debug!(
                feed = %feed.name,
                page,
                fetched = page_len,
                total = collected.len(),
                "Fetched article page"
            );

            if collected.len() >= max_items {
                collected.truncate(max_items);
                debug!(feed = %feed.name, cap = max_items, "Per-feed article cap reached");
                break;
            }
            if !response.has_more || page_len == 0 {
                break;
            }

            page += 1;
            // Pause between pages to stay under the platform's rate limit.
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        Ok(collected)
    }

    // =========================================================================
    // Materialize phase
    // =========================================================================

    async fn materialize_notes(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let pending = self.db.get_unmaterialized_articles().await?;

        if pending.is_empty() {
            debug!("No articles awaiting notes");
            return Ok(());
        }

        let feeds: HashMap<i64, Feed> = self
            .db
            .list_feeds()
            .await?
            .into_iter()
            .map(|feed| (feed.id, feed))
            .collect();

        info!(pending = pending.len(), "Materializing notes");

        let outcome = self.notes.materialize_batch(&pending, &feeds).await?;

        let recorded = outcome.recorded_paths();
        if !recorded.is_empty() {
            self.db.mark_articles_materialized(&recorded).await?;
        }

        for failure in &outcome.failed {
            report.record_note_failure(failure.article_id, &failure.error);
        }
        report.record_notes(
            outcome.created.len() as u64,
            outcome.skipped.len() as u64,
            outcome.failed.len() as u64,
        );

        Ok(())
    }

    // =========================================================================
    // Cleanup phase
    // =========================================================================

    async fn cleanup(&self, report: &mut SyncReport) {
        match self.run_cleanup().await {
            Ok((articles, notes)) => {
                if articles > 0 || notes > 0 {
                    info!(articles, notes, "Cleanup removed expired data");
                }
                report.record_cleanup(articles, notes);
            }
            Err(err) => {
                // A failed cleanup reports zero deletions; the next run
                // picks the same rows up again.
                warn!(error = %err, "Cleanup failed");
                report.record_cleanup(0, 0);
            }
        }
    }

    async fn run_cleanup(&self) -> Result<(u64, u64), SyncError> {
        let cutoff = Utc::now() - chrono::Duration::days(self.sync_config.retention_days as i64);
        let deleted_ids = self.db.delete_articles_older_than(cutoff).await?;

        if deleted_ids.is_empty() {
            return Ok((0, 0));
        }

        let notes_deleted = self.notes.delete_by_article_ids(&deleted_ids).await?;
        Ok((deleted_ids.len() as u64, notes_deleted))
    }
}

#[async_trait]
impl<D: Database, C: ContentApi> SyncTask for SyncEngine<D, C> {
    fn name(&self) -> &str {
        "feed-sync"
    }

    async fn execute(&self) -> Result<(), AppError> {
        let report = self.run(SyncOptions::default()).await?;
        if report.has_errors() {
            warn!(
                errors = report.errors.len(),
                "Scheduled sync completed with errors"
            );
        }
        Ok(())
    }
}
