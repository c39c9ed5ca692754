//! Sync pipeline
//!
//! This module ties feed refresh, note materialization, and data cleanup
//! together into sequential runs, and schedules those runs on an interval.
//!
//! # Components
//!
//! - [`engine`]: Orchestrates the three sync phases with a single-run guard
//! - [`scheduler`]: Fixed-tick task scheduler driving periodic runs
//!
//! # Example
//!
//! ```ignore
//! use feedstash::sync::{Scheduler, SyncEngine, SyncOptions};
//!
//! // Run one sync by hand
//! let report = engine.run(SyncOptions::default()).await?;
//! println!("{}", report);
//!
//! // Or let the scheduler drive it
//! let scheduler = Scheduler::new(config.scheduler.clone());
//! let handle = scheduler.handle();
//! handle.register(engine, interval).await;
//! scheduler.start();
//! ```

pub mod engine;
pub mod scheduler;

// Re-export main types for convenience
pub use engine::{SyncEngine, SyncOptions};
pub use scheduler::{Scheduler, SchedulerHandle, SyncTask};
