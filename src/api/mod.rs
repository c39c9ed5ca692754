//! Content platform API access
//!
//! This module provides the outbound surface of the application: a typed
//! client for the platform's paged article endpoint and a retry manager
//! for riding out transient failures.
//!
//! # Components
//!
//! - [`client`]: ContentApi trait and reqwest-based implementation
//! - [`retry`]: Retry manager with bounded doubling backoff
//!
//! # Example
//!
//! ```ignore
//! use feedstash::api::{HttpContentApi, RetryManager};
//! use feedstash::config::{ApiConfig, RetryConfig};
//!
//! let api = HttpContentApi::new(&ApiConfig::default());
//! let retry = RetryManager::new(RetryConfig::default());
//!
//! // Wrap each page fetch in the retry budget
//! let page = retry.execute(|| async {
//!     api.fetch_articles("rust-blog", "token-a", 1).await
//! }).await;
//! ```

pub mod client;
pub mod retry;

// Re-export main types for convenience
pub use client::{ArticlePage, ContentApi, FetchedArticle, HttpContentApi};
pub use retry::RetryManager;

#[cfg(test)]
pub use client::MockContentApi;
