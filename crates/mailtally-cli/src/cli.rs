//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mailtally - Rolling email category statistics and blocking recommendations
#[derive(Parser)]
#[command(name = "mailtally")]
#[command(about = "Per-account email category statistics and blocking recommendations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "mailtally.db", global = true)]
    pub db: PathBuf,

    /// Recommendation config file (TOML). Falls back to MAILTALLY_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set MAILTALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },

    /// Show database status (encryption, size, tally counts)
    Status,

    /// Manage accounts (list, add, delete)
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Record category counts for one processing run
    Record {
        /// Account ID
        account: String,

        /// Counts as CATEGORY=N (e.g., Marketing=45 Personal=12)
        #[arg(required = true)]
        counts: Vec<String>,

        /// Day the emails belong to (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show raw category statistics for a rolling window
    Stats {
        /// Account ID
        account: String,

        /// Window length in days
        #[arg(short, long, default_value = "7")]
        days: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show blocking recommendations for a rolling window
    Recommend {
        /// Account ID
        account: String,

        /// Window length in days
        #[arg(short, long, default_value = "7")]
        days: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Explain why a category is recommended
    Explain {
        /// Account ID
        account: String,

        /// Category name
        category: String,

        /// Window length in days
        #[arg(short, long, default_value = "7")]
        days: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Mark a category as blocked for an account
    Block {
        /// Account ID
        account: String,
        /// Category name
        category: String,
    },

    /// Remove a blocked category
    Unblock {
        /// Account ID
        account: String,
        /// Category name
        category: String,
    },

    /// Delete tallies older than the retention window
    Prune {
        /// Show the cutoff without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts (default)
    List,

    /// Register an account
    Add {
        /// Account ID (as used by the processing pipeline)
        id: String,

        /// Mailbox address
        #[arg(long)]
        email: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete an account with its tallies and blocked categories
    Delete {
        /// Account ID
        id: String,
    },
}
