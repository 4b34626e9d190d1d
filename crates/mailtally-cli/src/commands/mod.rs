//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `accounts` - Account commands (list, add, delete)
//! - `blocked` - Block/unblock categories
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `record` - Record category counts from a processing run
//! - `reports` - Stats, recommendations and explanations
//! - `retention` - Prune expired tallies
//! - `serve` - Web server command
//! - `status` - Database status

pub mod accounts;
pub mod blocked;
pub mod core;
pub mod record;
pub mod reports;
pub mod retention;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use accounts::*;
pub use blocked::*;
pub use self::core::*;
pub use record::*;
pub use reports::*;
pub use retention::*;
pub use serve::*;
pub use status::*;
