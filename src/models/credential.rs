//! Credential domain models
//!
//! This module defines the rotating platform credentials and their
//! lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a credential
///
/// `Disabled` is only ever set by an operator; the pool never enters or
/// leaves it. `Expired` requires re-authentication outside this system.
/// `Blacklisted` heals back to `Active` once the cool-down passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Usable for API calls
    #[default]
    Active,
    /// Turned off by an operator
    Disabled,
    /// Rejected by the platform, needs re-authentication
    Expired,
    /// Throttled by the platform, cooling down
    Blacklisted,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialStatus::Active => write!(f, "active"),
            CredentialStatus::Disabled => write!(f, "disabled"),
            CredentialStatus::Expired => write!(f, "expired"),
            CredentialStatus::Blacklisted => write!(f, "blacklisted"),
        }
    }
}

impl std::str::FromStr for CredentialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CredentialStatus::Active),
            "disabled" => Ok(CredentialStatus::Disabled),
            "expired" => Ok(CredentialStatus::Expired),
            "blacklisted" => Ok(CredentialStatus::Blacklisted),
            _ => Err(format!("Invalid credential status: {}", s)),
        }
    }
}

/// A platform credential stored in the database
///
/// Credentials are created by an external login flow and only mutated here
/// through status transitions. Invariant: `blacklisted_until` is `Some` if
/// and only if `status == Blacklisted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Database ID
    pub id: i64,

    /// Human-readable label
    pub label: String,

    /// Opaque secret material presented to the platform
    pub secret: String,

    /// Current lifecycle state
    pub status: CredentialStatus,

    /// End of the rate-limit cool-down (set iff blacklisted)
    pub blacklisted_until: Option<DateTime<Utc>>,

    /// When the credential was created
    pub created_at: DateTime<Utc>,

    /// When the credential was last updated
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Create a new active credential
    pub fn new(id: i64, label: impl Into<String>, secret: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            label: label.into(),
            secret: secret.into(),
            status: CredentialStatus::Active,
            blacklisted_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: CredentialStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the cool-down expiry
    pub fn with_blacklisted_until(mut self, until: DateTime<Utc>) -> Self {
        self.blacklisted_until = Some(until);
        self
    }

    /// Check if the credential can be handed out
    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }

    /// Check if a blacklisted credential's cool-down has passed
    ///
    /// Always false for credentials that are not blacklisted.
    pub fn blacklist_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == CredentialStatus::Blacklisted
            && self.blacklisted_until.map(|until| now > until).unwrap_or(false)
    }
}
