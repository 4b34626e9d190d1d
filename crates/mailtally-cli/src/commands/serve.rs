//! Server command implementation

use std::path::Path;

use anyhow::Result;
use mailtally_core::RecommendationConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    cors_origins: Vec<String>,
    no_encrypt: bool,
    config: RecommendationConfig,
) -> Result<()> {
    println!("🚀 Starting mailtally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!(
        "   Recommendations: threshold {}%, minimum {} emails, windows up to {} days",
        config.threshold_percentage, config.minimum_count, config.max_window_days
    );
    println!(
        "   Excluded categories: {}",
        config
            .excluded_categories
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !cors_origins.is_empty() {
        println!("   CORS origins: {}", cors_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let server_config = mailtally_server::ServerConfig {
        allowed_origins: cors_origins,
    };

    mailtally_server::serve_with_config(db, host, port, config, server_config).await?;

    Ok(())
}
