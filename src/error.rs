//! Application error types for feedstash
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Errors returned by the content platform API
///
/// Every outbound call surfaces as one of these classified variants. The
/// retry layer consults [`RetryableError`] to decide whether a failed call
/// may be attempted again; terminal variants are acted on by the credential
/// pool instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// Network timeout
    #[error("Network timeout")]
    NetworkTimeout,

    /// Connection refused
    #[error("Connection refused")]
    ConnectionRefused,

    /// Generic network error
    #[error("Network error: {0}")]
    Network(String),

    /// Server error
    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    /// Credential rejected by the platform
    #[error("Authentication expired")]
    AuthExpired,

    /// Throttled by the platform
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Request rejected as malformed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Async connection bridge error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Note store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during a note operation
    #[error("Note store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configured notes path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

/// Errors returned by a sync run
///
/// Per-feed and per-article failures are folded into the run report instead;
/// these variants cover the busy guard and infrastructure failures that abort
/// a run outright.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A run is already in progress
    #[error("Sync already in progress")]
    AlreadyRunning,

    /// Database error outside any per-feed scope
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Note store error outside the per-article scope
    #[error("Note store error: {0}")]
    Store(#[from] StoreError),
}

/// Reasons a single feed's refresh failed
///
/// These end up in the run report; one failing feed never aborts the rest
/// of the run.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No usable credential in the pool
    #[error("No credential available")]
    NoCredential,

    /// Platform API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Database failure within this feed's scope
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Application-level error type
///
/// This is the main error type used throughout the application.
/// It aggregates all domain-specific error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// API error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Note store error
    #[error("Note store error: {0}")]
    Store(#[from] StoreError),

    /// Sync error
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for determining if an error is retryable
pub trait RetryableError {
    /// Returns true if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            // Retryable errors
            ApiError::NetworkTimeout => true,
            ApiError::ConnectionRefused => true,
            ApiError::Network(_) => true,
            ApiError::ServerError(code) if *code >= 500 => true,

            // Non-retryable errors. RateLimited is terminal here: the
            // credential gets blacklisted rather than the call retried.
            ApiError::ServerError(_) => false, // 4xx errors
            ApiError::AuthExpired => false,
            ApiError::RateLimited(_) => false,
            ApiError::MalformedRequest(_) => false,
            ApiError::NotFound => false,
            ApiError::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: ApiError message formatting
    #[test]
    fn test_api_error_messages() {
        assert_eq!(ApiError::NetworkTimeout.to_string(), "Network timeout");
        assert_eq!(ApiError::ConnectionRefused.to_string(), "Connection refused");
        assert_eq!(
            ApiError::RateLimited(60).to_string(),
            "Rate limited, retry after 60 seconds"
        );
        assert_eq!(
            ApiError::ServerError(503).to_string(),
            "Server error: HTTP 503"
        );
        assert_eq!(ApiError::AuthExpired.to_string(), "Authentication expired");
        assert_eq!(
            ApiError::MalformedRequest("missing page".to_string()).to_string(),
            "Malformed request: missing page"
        );
        assert_eq!(
            ApiError::InvalidResponse("bad json".to_string()).to_string(),
            "Invalid response: bad json"
        );
    }

    // Test 2: Retryable classifications
    #[test]
    fn test_api_error_retryable() {
        assert!(ApiError::NetworkTimeout.is_retryable());
        assert!(ApiError::ConnectionRefused.is_retryable());
        assert!(ApiError::Network("connection reset".to_string()).is_retryable());
        assert!(ApiError::ServerError(500).is_retryable());
        assert!(ApiError::ServerError(503).is_retryable());
    }

    // Test 3: Terminal classifications are never retryable
    #[test]
    fn test_api_error_terminal() {
        assert!(!ApiError::AuthExpired.is_retryable());
        assert!(!ApiError::RateLimited(30).is_retryable());
        assert!(!ApiError::MalformedRequest("bad field".to_string()).is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
        assert!(!ApiError::InvalidResponse("truncated".to_string()).is_retryable());
        assert!(!ApiError::ServerError(404).is_retryable()); // 4xx
        assert!(!ApiError::ServerError(422).is_retryable());
    }

    // Test 4: DbError messages
    #[test]
    fn test_db_error_messages() {
        assert_eq!(DbError::NotFound.to_string(), "Record not found");
        assert_eq!(
            DbError::Migration("v2 failed".to_string()).to_string(),
            "Migration error: v2 failed"
        );
        assert_eq!(
            DbError::Connection("connection closed".to_string()).to_string(),
            "Database connection error: connection closed"
        );
    }

    // Test 5: DbError from rusqlite::Error
    #[test]
    fn test_db_error_from_sqlite() {
        let sqlite_err = rusqlite::Error::InvalidParameterName("test".to_string());
        let db_err: DbError = sqlite_err.into();

        match db_err {
            DbError::Sqlite(_) => (),
            _ => panic!("Expected DbError::Sqlite"),
        }
    }

    // Test 6: DbError from tokio_rusqlite::Error unwraps the rusqlite case
    #[test]
    fn test_db_error_from_tokio_rusqlite() {
        let inner = rusqlite::Error::InvalidParameterName("test".to_string());
        let bridge_err = tokio_rusqlite::Error::Rusqlite(inner);
        let db_err: DbError = bridge_err.into();

        match db_err {
            DbError::Sqlite(_) => (),
            _ => panic!("Expected DbError::Sqlite"),
        }

        let closed: DbError = tokio_rusqlite::Error::ConnectionClosed.into();
        match closed {
            DbError::Connection(_) => (),
            _ => panic!("Expected DbError::Connection"),
        }
    }

    // Test 7: StoreError from IO error
    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();

        match store_err {
            StoreError::Io(_) => (),
            _ => panic!("Expected StoreError::Io"),
        }
    }

    // Test 8: SyncError messages
    #[test]
    fn test_sync_error_messages() {
        assert_eq!(
            SyncError::AlreadyRunning.to_string(),
            "Sync already in progress"
        );
        assert_eq!(
            SyncError::Database(DbError::NotFound).to_string(),
            "Database error: Record not found"
        );
    }

    // Test 9: SyncError from DbError
    #[test]
    fn test_sync_error_from_db_error() {
        let db_err = DbError::NotFound;
        let sync_err: SyncError = db_err.into();

        match sync_err {
            SyncError::Database(DbError::NotFound) => (),
            _ => panic!("Expected SyncError::Database(DbError::NotFound)"),
        }
    }

    // Test 10: From trait conversions for AppError
    #[test]
    fn test_app_error_from_api_error() {
        let api_err = ApiError::NetworkTimeout;
        let app_err: AppError = api_err.into();

        match app_err {
            AppError::Api(ApiError::NetworkTimeout) => (),
            _ => panic!("Expected AppError::Api(ApiError::NetworkTimeout)"),
        }
    }

    // Test 11: AppError from SyncError
    #[test]
    fn test_app_error_from_sync_error() {
        let sync_err = SyncError::AlreadyRunning;
        let app_err: AppError = sync_err.into();

        match app_err {
            AppError::Sync(SyncError::AlreadyRunning) => (),
            _ => panic!("Expected AppError::Sync(SyncError::AlreadyRunning)"),
        }
    }

    // Test 12: AppError display includes source error
    #[test]
    fn test_app_error_display() {
        let app_err = AppError::Api(ApiError::RateLimited(120));
        assert_eq!(
            app_err.to_string(),
            "API error: Rate limited, retry after 120 seconds"
        );

        let app_err = AppError::Sync(SyncError::AlreadyRunning);
        assert_eq!(app_err.to_string(), "Sync error: Sync already in progress");
    }

    // Test 13: AppError Config and Internal variants
    #[test]
    fn test_app_error_config_and_internal() {
        let config_err = AppError::Config("missing field".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: missing field");

        let internal_err = AppError::Internal("unexpected state".to_string());
        assert_eq!(internal_err.to_string(), "Internal error: unexpected state");
    }

    // Test 14: ApiError Clone and PartialEq
    #[test]
    fn test_api_error_clone_and_eq() {
        let err1 = ApiError::RateLimited(60);
        let err2 = err1.clone();
        assert_eq!(err1, err2);

        let err3 = ApiError::RateLimited(120);
        assert_ne!(err1, err3);
    }

    // Test 15: FeedError messages pass the source through untouched
    #[test]
    fn test_feed_error_messages() {
        assert_eq!(
            FeedError::NoCredential.to_string(),
            "No credential available"
        );
        assert_eq!(
            FeedError::Api(ApiError::AuthExpired).to_string(),
            "Authentication expired"
        );
        assert_eq!(
            FeedError::Database(DbError::NotFound).to_string(),
            "Record not found"
        );
    }
}
