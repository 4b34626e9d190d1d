//! Mailtally CLI - Email category statistics and blocking recommendations
//!
//! Usage:
//!   mailtally init                             Initialize database
//!   mailtally record ACCOUNT Marketing=45 ...  Record a processing run
//!   mailtally recommend ACCOUNT --days 7       Show recommendations
//!   mailtally serve --port 3000                Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            cors_origins,
        } => {
            let config = commands::load_config(config_path)?;
            commands::cmd_serve(&cli.db, &host, port, cors_origins, cli.no_encrypt, config).await
        }
        Commands::Status => {
            let config = commands::load_config(config_path)?;
            commands::cmd_status(&cli.db, cli.no_encrypt, &config)
        }
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add { id, email, name }) => {
                    commands::cmd_accounts_add(&db, &id, email.as_deref(), name.as_deref())
                }
                Some(AccountsAction::Delete { id }) => commands::cmd_accounts_delete(&db, &id),
            }
        }
        Commands::Record {
            account,
            counts,
            date,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_record(&db, &config, &account, &counts, date.as_deref())
        }
        Commands::Stats {
            account,
            days,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_stats(&db, &config, &account, days, json)
        }
        Commands::Recommend {
            account,
            days,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_recommend(&db, &config, &account, days, json)
        }
        Commands::Explain {
            account,
            category,
            days,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_explain(&db, &config, &account, &category, days, json)
        }
        Commands::Block { account, category } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_block(&db, &account, &category)
        }
        Commands::Unblock { account, category } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_unblock(&db, &account, &category)
        }
        Commands::Prune { dry_run } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_prune(&db, &config, dry_run)
        }
    }
}
