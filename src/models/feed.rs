//! Feed domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subscribed feed on the content platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Database ID
    pub id: i64,

    /// Human-readable name
    pub name: String,

    /// Identifier of the feed on the platform
    pub source_id: String,

    /// Credential that registered the feed
    ///
    /// Provenance only; refresh acquires from the whole pool.
    pub credential_id: i64,

    /// Completion time of the last successful refresh (None = never synced)
    pub last_sync_at: Option<DateTime<Utc>>,

    /// When the feed was created
    pub created_at: DateTime<Utc>,
}

impl Feed {
    /// Create a new feed that has never been synced
    pub fn new(
        id: i64,
        name: impl Into<String>,
        source_id: impl Into<String>,
        credential_id: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source_id: source_id.into(),
            credential_id,
            last_sync_at: None,
            created_at: Utc::now(),
        }
    }

    /// Set the last sync time
    pub fn with_last_sync_at(mut self, ts: DateTime<Utc>) -> Self {
        self.last_sync_at = Some(ts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_feed_never_synced() {
        let feed = Feed::new(1, "daily-briefing", "mp-890abc", 7);
        assert_eq!(feed.name, "daily-briefing");
        assert_eq!(feed.source_id, "mp-890abc");
        assert_eq!(feed.credential_id, 7);
        assert!(feed.last_sync_at.is_none());
    }

    #[test]
    fn test_feed_with_last_sync_at() {
        let ts = Utc::now() - Duration::hours(3);
        let feed = Feed::new(1, "daily-briefing", "mp-890abc", 7).with_last_sync_at(ts);
        assert_eq!(feed.last_sync_at, Some(ts));
    }
}
