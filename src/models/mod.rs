//! Domain models for feedstash
//!
//! This module contains the core domain models used throughout the application.

pub mod article;
pub mod credential;
pub mod feed;
pub mod report;

// Re-export commonly used types
pub use article::{Article, NewArticle};
pub use credential::{Credential, CredentialStatus};
pub use feed::Feed;
pub use report::SyncReport;
