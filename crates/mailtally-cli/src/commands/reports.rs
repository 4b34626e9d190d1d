//! Report commands: raw stats, recommendations and explanations

use std::sync::Arc;

use anyhow::Result;
use mailtally_core::models::RecommendationStrength;
use mailtally_core::{db::Database, BlockingRecommendationService, RecommendationConfig};

use super::truncate;

fn service(db: &Database, config: &RecommendationConfig) -> BlockingRecommendationService {
    let store = Arc::new(db.clone());
    BlockingRecommendationService::new(store.clone(), store, Arc::new(config.clone()))
}

fn strength_icon(strength: RecommendationStrength) -> &'static str {
    match strength {
        RecommendationStrength::High => "🔴",
        RecommendationStrength::Medium => "🟠",
        RecommendationStrength::Low => "🟡",
    }
}

pub fn cmd_stats(
    db: &Database,
    config: &RecommendationConfig,
    account_id: &str,
    days: u32,
    json: bool,
) -> Result<()> {
    db.require_account(account_id)?;
    let stats = service(db, config).get_category_stats(account_id, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "📊 Category stats for {} ({} to {})",
        account_id, stats.start_date, stats.end_date
    );
    println!("   ─────────────────────────────────────────────────────────────");

    if stats.total_emails == 0 {
        println!("   No emails recorded in the past {} days", days);
        return Ok(());
    }

    println!(
        "   {:<28} {:>8} {:>8} {:>9}  {}",
        "Category", "Emails", "Share", "Per day", "Trend"
    );
    for summary in &stats.category_summaries {
        println!(
            "   {:<28} {:>8} {:>7.1}% {:>9.1}  {}",
            truncate(&summary.category, 28),
            summary.total_count,
            summary.percentage,
            summary.daily_average,
            summary.trend
        );
    }
    println!();
    println!(
        "   {} emails over {} day(s) with data",
        stats.total_emails, stats.days_with_data
    );

    Ok(())
}

pub fn cmd_recommend(
    db: &Database,
    config: &RecommendationConfig,
    account_id: &str,
    days: u32,
    json: bool,
) -> Result<()> {
    db.require_account(account_id)?;
    let result = service(db, config).get_recommendations(account_id, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!(
        "🧹 Blocking recommendations for {} (past {} days, {} emails)",
        account_id, days, result.total_emails_analyzed
    );
    println!("   ─────────────────────────────────────────────────────────────");

    if result.recommendations.is_empty() {
        println!("   Nothing to recommend");
    }
    for rec in &result.recommendations {
        println!(
            "   {} {:<6} {}",
            strength_icon(rec.strength),
            rec.strength,
            rec.reason
        );
    }

    if !result.already_blocked.is_empty() {
        println!();
        println!(
            "   Already blocked: {}",
            result
                .already_blocked
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

pub fn cmd_explain(
    db: &Database,
    config: &RecommendationConfig,
    account_id: &str,
    category: &str,
    days: u32,
    json: bool,
) -> Result<()> {
    db.require_account(account_id)?;
    let reason = service(db, config).get_recommendation_reasons(account_id, category, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reason)?);
        return Ok(());
    }

    println!();
    println!(
        "{} {} - {} recommendation",
        strength_icon(reason.strength),
        reason.category,
        reason.strength
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {}", reason.reason);
    println!();
    for factor in &reason.recommendation_factors {
        println!("   • {}", factor);
    }

    println!();
    println!("   Daily breakdown:");
    for day in &reason.daily_breakdown {
        println!("     {}  {:>6}", day.date, day.count);
    }

    if !reason.comparable_categories.is_empty() {
        println!();
        println!("   Other categories:");
        for other in &reason.comparable_categories {
            println!(
                "     {:<28} {:>6} ({:.1}%)",
                truncate(&other.category, 28),
                other.total_count,
                other.percentage
            );
        }
    }

    Ok(())
}
