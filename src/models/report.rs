//! Per-run sync report

use serde::{Deserialize, Serialize};

/// Aggregate outcome of one sync run
///
/// Created fresh per run and returned to the caller; never persisted.
/// Per-feed and per-article failures land in `errors` in the order they
/// occurred while the counters keep tallying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Feeds refreshed end to end
    pub feeds_refreshed: u64,

    /// Feeds that failed and were skipped over
    pub feeds_failed: u64,

    /// Articles newly persisted this run
    pub articles_fetched: u64,

    /// Notes written by the materialize phase
    pub notes_created: u64,

    /// Notes skipped because the file already existed
    pub notes_skipped: u64,

    /// Notes that failed to materialize
    pub notes_failed: u64,

    /// Articles removed by the cleanup phase
    pub articles_deleted: u64,

    /// Notes removed by the cleanup phase
    pub notes_deleted: u64,

    /// Failure messages, in occurrence order
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a fully refreshed feed and its newly persisted articles
    pub fn record_feed_success(&mut self, new_articles: u64) {
        self.feeds_refreshed += 1;
        self.articles_fetched += new_articles;
    }

    /// Count a failed feed and record its error
    pub fn record_feed_failure(&mut self, feed_name: &str, error: impl std::fmt::Display) {
        self.feeds_failed += 1;
        self.errors.push(format!("feed {}: {}", feed_name, error));
    }

    /// Merge the materialize phase counts
    pub fn record_notes(&mut self, created: u64, skipped: u64, failed: u64) {
        self.notes_created += created;
        self.notes_skipped += skipped;
        self.notes_failed += failed;
    }

    /// Record a single note failure message
    pub fn record_note_failure(&mut self, article_id: i64, error: impl std::fmt::Display) {
        self.errors.push(format!("note for article {}: {}", article_id, error));
    }

    /// Set the cleanup phase counts
    pub fn record_cleanup(&mut self, articles_deleted: u64, notes_deleted: u64) {
        self.articles_deleted = articles_deleted;
        self.notes_deleted = notes_deleted;
    }

    /// Whether any failure was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} feeds refreshed ({} failed), {} new articles, \
             {} notes created ({} skipped, {} failed), \
             {} articles and {} notes cleaned up, {} errors",
            self.feeds_refreshed,
            self.feeds_failed,
            self.articles_fetched,
            self.notes_created,
            self.notes_skipped,
            self.notes_failed,
            self.articles_deleted,
            self.notes_deleted,
            self.errors.len()
        )
    }
}
