//! feedstash - A feed aggregation engine with credential pooling and note export
//!
//! This crate syncs articles from a content platform into a local SQLite
//! database, rotates through a pool of API credentials, and materializes
//! fetched articles as Markdown notes on disk.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod notes;
pub mod pool;
pub mod sync;
