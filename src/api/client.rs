//! HTTP client for the content platform API
//!
//! This module defines the ContentApi trait used by the sync pipeline and
//! its reqwest-based implementation. Transport failures and HTTP statuses
//! are mapped onto the ApiError taxonomy so callers can tell transient
//! failures from terminal ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Fallback wait when the platform rate-limits without a Retry-After header
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// One article as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedArticle {
    /// Canonical article URL, unique across the platform
    pub url: String,
    /// Article title
    pub title: String,
    /// Short summary, if the platform provides one
    #[serde(default)]
    pub summary: Option<String>,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
}

/// One page of articles for a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePage {
    /// Articles on this page, newest first
    #[serde(default)]
    pub articles: Vec<FetchedArticle>,
    /// Whether another page follows
    #[serde(default)]
    pub has_more: bool,
}

/// Client trait for the content platform API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch one page of articles for a feed source
    ///
    /// Pages are numbered from 1. The secret authenticates the request
    /// as a bearer token.
    async fn fetch_articles(
        &self,
        source_id: &str,
        secret: &str,
        page: u32,
    ) -> Result<ArticlePage, ApiError>;
}

/// reqwest-based ContentApi implementation
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl HttpContentApi {
    /// Create a new client from the API configuration
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        }
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch_articles(
        &self,
        source_id: &str,
        secret: &str,
        page: u32,
    ) -> Result<ArticlePage, ApiError> {
        let url = format!("{}/feeds/{}/articles", self.base_url, source_id);

        debug!(source_id = source_id, page = page, "Fetching article page");

        let response = self
            .client
            .get(&url)
            .query(&[("page", page), ("page_size", self.page_size)])
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::NetworkTimeout
                } else if e.is_connect() {
                    ApiError::ConnectionRefused
                } else {
                    ApiError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let article_page = response
                    .json::<ArticlePage>()
                    .await
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

                debug!(
                    source_id = source_id,
                    articles = article_page.articles.len(),
                    has_more = article_page.has_more,
                    "Received article page"
                );

                Ok(article_page)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(
                    source_id = source_id,
                    status = status.as_u16(),
                    "Credential rejected by platform"
                );
                Err(ApiError::AuthExpired)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);

                warn!(
                    source_id = source_id,
                    retry_after = wait,
                    "Rate limited by platform"
                );
                Err(ApiError::RateLimited(wait))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text().await.unwrap_or_default();
                warn!(source_id = source_id, "Request rejected as malformed");
                Err(ApiError::MalformedRequest(if detail.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    detail
                }))
            }
            StatusCode::NOT_FOUND => {
                debug!(source_id = source_id, "Feed not found (404)");
                Err(ApiError::NotFound)
            }
            status if status.is_server_error() => {
                warn!(
                    source_id = source_id,
                    status = status.as_u16(),
                    "Server error"
                );
                Err(ApiError::ServerError(status.as_u16()))
            }
            status => {
                warn!(
                    source_id = source_id,
                    status = status.as_u16(),
                    "Unexpected status"
                );
                Err(ApiError::ServerError(status.as_u16()))
            }
        }
    }
}
