//! Mailtally Core Library
//!
//! Rolling per-category email statistics for mailbox accounts:
//! - Database access and migrations (SQLCipher-encrypted SQLite)
//! - Buffered aggregation of categorized emails into daily tallies
//! - Half-window trend classification
//! - Blocking recommendations with tiered strength and explanations
//! - Retention of daily tallies

pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod recommendations;
pub mod retention;
pub mod store;
pub mod trend;

pub use aggregator::{BufferKey, CategoryAggregator, FlushFailure, FlushReport};
pub use config::RecommendationConfig;
pub use db::{AuditEntry, Database, TallyStats};
pub use error::{Error, Result};
pub use recommendations::{BlockingRecommendationService, DEFAULT_WINDOW_DAYS};
pub use retention::{RetentionJob, RetentionReport};
pub use store::{BlockedCategorySource, TallyStore};
pub use trend::{TrendAnalysis, TrendAnalyzer};
