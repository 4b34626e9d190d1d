//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod audit;
pub mod blocked;
pub mod health;
pub mod ingest;
pub mod recommendations;

// Re-export all handlers for use in router
pub use accounts::*;
pub use audit::*;
pub use blocked::*;
pub use health::*;
pub use ingest::*;
pub use recommendations::*;
