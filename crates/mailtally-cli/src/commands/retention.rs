//! Prune command: apply the retention window once

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use mailtally_core::{db::Database, RecommendationConfig, RetentionJob};

pub fn cmd_prune(db: &Database, config: &RecommendationConfig, dry_run: bool) -> Result<()> {
    let job = RetentionJob::new(Arc::new(db.clone()), Arc::new(config.clone()));

    if dry_run {
        let cutoff = job.cutoff(Utc::now().date_naive());
        println!(
            "🔎 Would delete tallies dated before {} (retention {} days)",
            cutoff, config.retention_days
        );
        return Ok(());
    }

    let report = job.run()?;
    db.log_audit(
        "cli",
        "retention",
        Some("daily_tally"),
        None,
        Some(&format!("cutoff={}, deleted={}", report.cutoff, report.deleted)),
    )?;

    println!(
        "🧽 Deleted {} account-day tall{} dated before {}",
        report.deleted,
        if report.deleted == 1 { "y" } else { "ies" },
        report.cutoff
    );
    Ok(())
}
