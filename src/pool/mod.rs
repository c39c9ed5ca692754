//! Credential pool management
//!
//! This module tracks the lifecycle of platform API credentials. Credentials
//! move between Active, Expired, Blacklisted and Disabled as API calls
//! succeed or fail, and the pool hands out an active credential for each
//! sync operation.

pub mod strategy;

pub use strategy::{FirstAvailable, SelectionStrategy};

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::database::Database;
use crate::error::{ApiError, DbError};
use crate::models::{Credential, CredentialStatus};

/// Credential pool
///
/// Hands out credentials for API calls and records call outcomes back
/// onto them. Blacklisted credentials return to rotation lazily: the
/// next acquisition after their cool-down passes reactivates them.
pub struct CredentialPool<D: Database> {
    db: Arc<D>,
    strategy: Box<dyn SelectionStrategy>,
    cooldown: Duration,
}

impl<D: Database> CredentialPool<D> {
    /// Create a new pool with the default first-available strategy
    pub fn new(db: Arc<D>, config: PoolConfig) -> Self {
        Self::with_strategy(db, config, Box::new(FirstAvailable))
    }

    /// Create a new pool with a custom selection strategy
    pub fn with_strategy(
        db: Arc<D>,
        config: PoolConfig,
        strategy: Box<dyn SelectionStrategy>,
    ) -> Self {
        Self {
            db,
            strategy,
            cooldown: Duration::hours(config.blacklist_cooldown_hours as i64),
        }
    }

    /// Pick a credential for the next API call
    ///
    /// Blacklisted credentials whose cool-down has passed are reactivated
    /// first, then the strategy chooses among the active ones. Returns
    /// None when no credential is usable.
    pub async fn acquire_available(&self) -> Result<Option<Credential>, DbError> {
        let now = Utc::now();
        let mut credentials = self.db.list_credentials().await?;

        for credential in credentials.iter_mut() {
            if credential.blacklist_expired(now) {
                info!(
                    credential_id = credential.id,
                    label = %credential.label,
                    "Blacklist cool-down passed, reactivating credential"
                );
                self.db
                    .update_credential_status(credential.id, CredentialStatus::Active, None)
                    .await?;
                credential.status = CredentialStatus::Active;
                credential.blacklisted_until = None;
            }
        }

        let active: Vec<Credential> = credentials.into_iter().filter(|c| c.is_active()).collect();

        Ok(self.strategy.select(&active).cloned())
    }

    /// Record the outcome of a failed API call made with the given credential
    ///
    /// Auth rejections expire the credential and rate limiting blacklists
    /// it until the configured cool-down passes. Any other error leaves
    /// the credential untouched.
    pub async fn record_api_error(
        &self,
        credential_id: i64,
        error: &ApiError,
    ) -> Result<(), DbError> {
        match error {
            ApiError::AuthExpired => {
                warn!(
                    credential_id = credential_id,
                    "Credential rejected by platform, marking expired"
                );
                self.db
                    .update_credential_status(credential_id, CredentialStatus::Expired, None)
                    .await
            }
            ApiError::RateLimited(retry_after) => {
                // The platform's Retry-After is informational only; the
                // cool-down comes from configuration.
                let until = Utc::now() + self.cooldown;
                warn!(
                    credential_id = credential_id,
                    retry_after_secs = retry_after,
                    blacklisted_until = %until,
                    "Credential rate limited, blacklisting"
                );
                self.db
                    .update_credential_status(credential_id, CredentialStatus::Blacklisted, Some(until))
                    .await
            }
            ApiError::MalformedRequest(detail) => {
                // Terminal for the call, but says nothing about the
                // credential's health.
                warn!(
                    credential_id = credential_id,
                    detail = %detail,
                    "Platform rejected request as malformed"
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Set a credential's status directly
    ///
    /// Blacklisting this way starts a fresh cool-down; any other status
    /// clears it.
    pub async fn set_status(
        &self,
        credential_id: i64,
        status: CredentialStatus,
    ) -> Result<(), DbError> {
        let until = match status {
            CredentialStatus::Blacklisted => Some(Utc::now() + self.cooldown),
            _ => None,
        };

        info!(
            credential_id = credential_id,
            status = %status,
            "Setting credential status"
        );
        self.db
            .update_credential_status(credential_id, status, until)
            .await
    }
}
