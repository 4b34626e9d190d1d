//! Record command: feed one processing run into the aggregator

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mailtally_core::{db::Database, CategoryAggregator, RecommendationConfig};

/// Parse `CATEGORY=N` into its parts
pub fn parse_count_pair(pair: &str) -> Result<(String, u64)> {
    let (category, count) = pair
        .rsplit_once('=')
        .with_context(|| format!("Expected CATEGORY=N, got '{}'", pair))?;

    let category = category.trim();
    if category.is_empty() {
        bail!("Missing category name in '{}'", pair);
    }
    let count: u64 = count
        .trim()
        .parse()
        .with_context(|| format!("Invalid count in '{}'", pair))?;

    Ok((category.to_string(), count))
}

pub fn cmd_record(
    db: &Database,
    config: &RecommendationConfig,
    account_id: &str,
    pairs: &[String],
    date: Option<&str>,
) -> Result<()> {
    db.require_account(account_id)?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for pair in pairs {
        let (category, count) = parse_count_pair(pair)?;
        let slot = counts.entry(category).or_insert(0);
        *slot = slot
            .checked_add(count)
            .with_context(|| format!("Count for '{}' is too large", pair))?;
    }

    let timestamp = match date {
        Some(d) => {
            let day = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", d))?;
            Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
        }
        None => Utc::now(),
    };

    let aggregator = CategoryAggregator::new(Arc::new(db.clone()), Arc::new(config.clone()));
    let report = aggregator
        .record_batch(account_id, &counts, timestamp)
        .context("Counts rejected")?;

    for failure in &report.failures {
        tracing::warn!(
            "Flush failed for {} on {}: {}",
            failure.account_id,
            failure.date,
            failure.error
        );
    }
    if let Some(failure) = report.failures.first() {
        bail!(
            "Failed to write tally for {} on {}: {}",
            failure.account_id,
            failure.date,
            failure.error
        );
    }

    db.log_audit(
        "cli",
        "record",
        Some("category_counts"),
        Some(account_id),
        Some(&format!(
            "date={}, categories={}, emails={}",
            timestamp.date_naive(),
            counts.len(),
            report.emails_flushed
        )),
    )?;

    println!(
        "📥 Recorded {} email(s) across {} categories for {} on {}",
        report.emails_flushed,
        counts.len(),
        account_id,
        timestamp.date_naive()
    );
    Ok(())
}
