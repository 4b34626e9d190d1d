//! Blocking recommendations built from rolling-window tallies
//!
//! The service reads an account's [`AggregatedTally`] for `[today - days, today]`
//! and walks its categories, largest first. A category is recommended when it:
//! - is not on the configured exclusion list
//! - has at least `minimum_count` emails in the window
//! - is not already blocked by the account owner
//! - holds at least `threshold_percentage` of the window's emails
//!
//! Strength is tiered by share (HIGH at 25%, MEDIUM at 15%, LOW at the
//! configured threshold).

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::debug;

use crate::config::RecommendationConfig;
use crate::error::{Error, Result};
use crate::models::{
    AggregatedTally, BlockingRecommendation, CategoryShare, CategorySummary, DailyCount,
    RecommendationReason, RecommendationResult, RecommendationStrength, TrendDirection,
};
use crate::store::{BlockedCategorySource, TallyStore};
use crate::trend::TrendAnalyzer;

/// Window length used when the caller does not pick one
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Why a category with emails in the window is not recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eligibility {
    Eligible(RecommendationStrength),
    Excluded,
    BelowMinimum,
    AlreadyBlocked,
    BelowThreshold,
}

impl Eligibility {
    fn describe(&self) -> &'static str {
        match self {
            Self::Eligible(_) => "eligible",
            Self::Excluded => "excluded from recommendations",
            Self::BelowMinimum => "below the minimum email count",
            Self::AlreadyBlocked => "already blocked",
            Self::BelowThreshold => "below the recommendation threshold",
        }
    }
}

/// Produces blocking recommendations and their explanations
#[derive(Clone)]
pub struct BlockingRecommendationService {
    store: Arc<dyn TallyStore>,
    blocked: Arc<dyn BlockedCategorySource>,
    config: Arc<RecommendationConfig>,
    analyzer: TrendAnalyzer,
}

impl BlockingRecommendationService {
    pub fn new(
        store: Arc<dyn TallyStore>,
        blocked: Arc<dyn BlockedCategorySource>,
        config: Arc<RecommendationConfig>,
    ) -> Self {
        let analyzer = TrendAnalyzer::with_threshold(config.trend_threshold_percentage);
        Self {
            store,
            blocked,
            config,
            analyzer,
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Recommendations for the window ending today (UTC)
    pub fn get_recommendations(&self, account_id: &str, days: u32) -> Result<RecommendationResult> {
        self.get_recommendations_as_of(account_id, days, Utc::now().date_naive())
    }

    /// Recommendations for the window `[today - days, today]`
    pub fn get_recommendations_as_of(
        &self,
        account_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> Result<RecommendationResult> {
        let aggregated = self.aggregate(account_id, days, today)?;

        let mut result = RecommendationResult {
            account_id: account_id.to_string(),
            period_start: aggregated.start_date,
            period_end: aggregated.end_date,
            days,
            total_emails_analyzed: aggregated.total_emails,
            recommendations: vec![],
            already_blocked: BTreeSet::new(),
            generated_at: Utc::now(),
        };

        if aggregated.total_emails == 0 {
            return Ok(result);
        }

        let blocked = self.blocked.blocked_categories(account_id)?;

        // Summaries arrive sorted by count descending, then name
        for summary in &aggregated.category_summaries {
            if blocked.contains(&summary.category) {
                result.already_blocked.insert(summary.category.clone());
            }

            match self.eligibility(summary, &blocked) {
                Eligibility::Eligible(strength) => {
                    result.recommendations.push(BlockingRecommendation {
                        category: summary.category.clone(),
                        strength,
                        email_count: summary.total_count,
                        percentage: summary.percentage,
                        reason: reason_text(summary, days),
                    });
                }
                skipped => {
                    debug!(
                        account_id,
                        category = %summary.category,
                        reason = skipped.describe(),
                        "Category not recommended"
                    );
                }
            }
        }

        Ok(result)
    }

    /// Detailed reasoning for one recommended category, window ending today (UTC)
    pub fn get_recommendation_reasons(
        &self,
        account_id: &str,
        category: &str,
        days: u32,
    ) -> Result<RecommendationReason> {
        self.get_recommendation_reasons_as_of(account_id, category, days, Utc::now().date_naive())
    }

    /// Detailed reasoning for one category over `[today - days, today]`
    ///
    /// Fails with `NotFound` when the category has no emails in the window or
    /// would not be recommended.
    pub fn get_recommendation_reasons_as_of(
        &self,
        account_id: &str,
        category: &str,
        days: u32,
        today: NaiveDate,
    ) -> Result<RecommendationReason> {
        let aggregated = self.aggregate(account_id, days, today)?;

        let summary = aggregated
            .summary(category)
            .filter(|s| s.total_count > 0)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no emails in category '{}' over the past {} days",
                    category, days
                ))
            })?;

        let blocked = self.blocked.blocked_categories(account_id)?;
        let strength = match self.eligibility(summary, &blocked) {
            Eligibility::Eligible(strength) => strength,
            other => {
                return Err(Error::NotFound(format!(
                    "category '{}' is not recommended for blocking ({})",
                    category,
                    other.describe()
                )))
            }
        };

        let tallies =
            self.store
                .get_tallies_for_period(account_id, aggregated.start_date, aggregated.end_date)?;
        let series: Vec<(NaiveDate, u64)> = tallies
            .iter()
            .map(|t| (t.tally_date, t.count(category)))
            .collect();
        let trend = self.analyzer.analyze(&series);

        let daily_breakdown = series
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(date, count)| DailyCount {
                date: *date,
                count: *count,
            })
            .collect();

        let comparable_categories = aggregated
            .category_summaries
            .iter()
            .filter(|s| s.category != category)
            .map(|s| CategoryShare {
                category: s.category.clone(),
                total_count: s.total_count,
                percentage: s.percentage,
            })
            .collect();

        let mut recommendation_factors = vec![
            format!(
                "{} emails over the past {} days (about {:.1} per active day)",
                summary.total_count, days, summary.daily_average
            ),
            format!(
                "{:.1}% of all {} emails analyzed ({} strength)",
                summary.percentage, aggregated.total_emails, strength
            ),
        ];
        recommendation_factors.push(match trend.direction {
            TrendDirection::Increasing if trend.percentage_change > 0.0 => format!(
                "Volume is trending upward ({:+.1}% between the earlier and later half of the window)",
                trend.percentage_change
            ),
            TrendDirection::Increasing => "Volume is trending upward".to_string(),
            TrendDirection::Decreasing => format!(
                "Volume is trending downward ({:+.1}% between the earlier and later half of the window)",
                trend.percentage_change
            ),
            TrendDirection::Stable => "Volume is stable".to_string(),
        });

        Ok(RecommendationReason {
            account_id: account_id.to_string(),
            category: summary.category.clone(),
            period_start: aggregated.start_date,
            period_end: aggregated.end_date,
            days,
            total_count: summary.total_count,
            percentage: summary.percentage,
            daily_average: summary.daily_average,
            strength,
            reason: reason_text(summary, days),
            daily_breakdown,
            trend_direction: trend.direction,
            trend_percentage_change: trend.percentage_change,
            comparable_categories,
            recommendation_factors,
        })
    }

    /// Raw aggregate for the window ending today (UTC), no filtering applied
    pub fn get_category_stats(&self, account_id: &str, days: u32) -> Result<AggregatedTally> {
        self.get_category_stats_as_of(account_id, days, Utc::now().date_naive())
    }

    pub fn get_category_stats_as_of(
        &self,
        account_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> Result<AggregatedTally> {
        self.aggregate(account_id, days, today)
    }

    fn aggregate(&self, account_id: &str, days: u32, today: NaiveDate) -> Result<AggregatedTally> {
        self.config.validate_window(days)?;
        let start = today - Duration::days(i64::from(days));
        self.store
            .get_aggregated_tallies_with(account_id, start, today, &self.analyzer)
    }

    fn eligibility(&self, summary: &CategorySummary, blocked: &BTreeSet<String>) -> Eligibility {
        if self.config.is_excluded(&summary.category) {
            return Eligibility::Excluded;
        }
        if summary.total_count < self.config.minimum_count {
            return Eligibility::BelowMinimum;
        }
        if blocked.contains(&summary.category) {
            return Eligibility::AlreadyBlocked;
        }
        match RecommendationStrength::from_percentage(
            summary.percentage,
            self.config.threshold_percentage,
        ) {
            Some(strength) => Eligibility::Eligible(strength),
            None => Eligibility::BelowThreshold,
        }
    }
}

fn reason_text(summary: &CategorySummary, days: u32) -> String {
    let mut reason = format!(
        "{} emails represent {:.1}% of your inbox over the past {} days ({} emails)",
        summary.category, summary.percentage, days, summary.total_count
    );
    if summary.trend == TrendDirection::Increasing {
        reason.push_str(". This category is trending upward.");
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::DailyTally;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 28).unwrap()
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    fn service_with(db: &Database, config: RecommendationConfig) -> BlockingRecommendationService {
        let db = Arc::new(db.clone());
        BlockingRecommendationService::new(db.clone(), db, Arc::new(config))
    }

    fn service(db: &Database) -> BlockingRecommendationService {
        service_with(db, RecommendationConfig::default())
    }

    fn seed(db: &Database, day: NaiveDate, counts: &[(&str, u64)]) {
        db.save_daily_tally(&DailyTally::from_counts(
            "acct",
            day,
            counts.iter().map(|(c, n)| (c.to_string(), *n)),
        ))
        .unwrap();
    }

    /// Marketing 250, Other 200, Advertising 150, Personal 100 over two days
    fn seed_mixed_inbox(db: &Database) {
        seed(
            db,
            days_ago(2),
            &[("Marketing", 125), ("Advertising", 75), ("Personal", 50), ("Other", 100)],
        );
        seed(
            db,
            days_ago(1),
            &[("Marketing", 125), ("Advertising", 75), ("Personal", 50), ("Other", 100)],
        );
    }

    #[test]
    fn test_mixed_inbox_strengths() {
        let db = Database::in_memory().unwrap();
        seed_mixed_inbox(&db);

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert_eq!(result.total_emails_analyzed, 700);
        assert_eq!(result.period_start, days_ago(7));
        assert_eq!(result.period_end, today());

        let categories: Vec<&str> = result
            .recommendations
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert_eq!(categories, vec!["Marketing", "Other", "Advertising"]);

        let marketing = &result.recommendations[0];
        assert_eq!(marketing.strength, RecommendationStrength::High);
        assert_eq!(marketing.email_count, 250);
        assert!(marketing.reason.contains("35.7%"));
        assert!(marketing.reason.contains("250 emails"));
        assert!(marketing.reason.contains("past 7 days"));

        assert_eq!(result.recommendations[1].strength, RecommendationStrength::High);
        assert_eq!(result.recommendations[2].strength, RecommendationStrength::Medium);
    }

    #[test]
    fn test_empty_window_is_not_an_error() {
        let db = Database::in_memory().unwrap();
        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert_eq!(result.total_emails_analyzed, 0);
        assert!(result.recommendations.is_empty());
        assert!(result.already_blocked.is_empty());
    }

    #[test]
    fn test_window_bounds_validated() {
        let db = Database::in_memory().unwrap();
        let service = service(&db);

        for days in [0, 31, 45] {
            let err = service.get_recommendations_as_of("acct", days, today()).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "days={}", days);
        }
        assert!(service.get_recommendations_as_of("acct", 30, today()).is_ok());
    }

    #[test]
    fn test_minimum_count_applies_even_at_full_share() {
        let db = Database::in_memory().unwrap();
        seed(&db, days_ago(1), &[("Promotions", 9)]);

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert_eq!(result.total_emails_analyzed, 9);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_below_threshold_skipped() {
        let db = Database::in_memory().unwrap();
        seed(&db, days_ago(1), &[("Newsletters", 12), ("Other", 188)]);

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].category, "Other");
    }

    #[test]
    fn test_blocked_category_reported_separately() {
        let db = Database::in_memory().unwrap();
        seed_mixed_inbox(&db);
        db.block_category("acct", "Marketing").unwrap();
        db.block_category("acct", "Gaming").unwrap();

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert!(result.recommendations.iter().all(|r| r.category != "Marketing"));
        // Only blocked categories that had mail in the window
        assert_eq!(
            result.already_blocked,
            BTreeSet::from(["Marketing".to_string()])
        );
    }

    #[test]
    fn test_custom_exclusions() {
        let db = Database::in_memory().unwrap();
        seed_mixed_inbox(&db);

        let config = RecommendationConfig {
            excluded_categories: BTreeSet::from(["Marketing".to_string()]),
            ..Default::default()
        };
        let result = service_with(&db, config)
            .get_recommendations_as_of("acct", 7, today())
            .unwrap();

        assert!(result.recommendations.iter().all(|r| r.category != "Marketing"));
        // Personal is no longer excluded: 100 of 700 is 14.3%, a LOW recommendation
        let personal = result
            .recommendations
            .iter()
            .find(|r| r.category == "Personal")
            .unwrap();
        assert_eq!(personal.strength, RecommendationStrength::Low);
    }

    #[test]
    fn test_window_excludes_older_tallies() {
        let db = Database::in_memory().unwrap();
        seed(&db, days_ago(10), &[("Marketing", 500)]);
        seed(&db, days_ago(3), &[("Social", 40)]);

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        assert_eq!(result.total_emails_analyzed, 40);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].category, "Social");
    }

    #[test]
    fn test_trending_reason_suffix() {
        let db = Database::in_memory().unwrap();
        for (i, count) in [20u64, 22, 25, 35, 40, 45, 50].iter().enumerate() {
            seed(&db, days_ago(7 - i as i64), &[("Marketing", *count), ("Other", 30)]);
        }

        let result = service(&db).get_recommendations_as_of("acct", 7, today()).unwrap();
        let marketing = result
            .recommendations
            .iter()
            .find(|r| r.category == "Marketing")
            .unwrap();
        assert!(marketing.reason.ends_with(". This category is trending upward."));

        let other = result
            .recommendations
            .iter()
            .find(|r| r.category == "Other")
            .unwrap();
        assert!(!other.reason.contains("trending"));
    }

    #[test]
    fn test_reasons_for_recommended_category() {
        let db = Database::in_memory().unwrap();
        for (i, count) in [20u64, 22, 25, 35, 40, 45, 50].iter().enumerate() {
            seed(&db, days_ago(7 - i as i64), &[("Marketing", *count), ("Social", 10)]);
        }

        let reason = service(&db)
            .get_recommendation_reasons_as_of("acct", "Marketing", 7, today())
            .unwrap();

        assert_eq!(reason.total_count, 237);
        assert_eq!(reason.daily_breakdown.len(), 7);
        assert_eq!(reason.daily_breakdown[0].date, days_ago(7));
        assert_eq!(reason.daily_breakdown[0].count, 20);
        assert!(reason
            .daily_breakdown
            .windows(2)
            .all(|w| w[0].date < w[1].date));
        assert_eq!(reason.trend_direction, TrendDirection::Increasing);
        assert!(reason.trend_percentage_change > 100.0);
        assert_eq!(reason.comparable_categories.len(), 1);
        assert_eq!(reason.comparable_categories[0].category, "Social");
        assert_eq!(reason.recommendation_factors.len(), 3);
        assert!(reason.recommendation_factors[2].contains("upward"));
        assert_eq!(reason.strength, RecommendationStrength::High);
    }

    #[test]
    fn test_reasons_not_found_cases() {
        let db = Database::in_memory().unwrap();
        seed_mixed_inbox(&db);
        db.block_category("acct", "Advertising").unwrap();
        let service = service(&db);

        // Never seen, excluded, blocked
        for category in ["Gaming", "Personal", "Advertising"] {
            let err = service
                .get_recommendation_reasons_as_of("acct", category, 7, today())
                .unwrap_err();
            assert!(matches!(err, Error::NotFound(_)), "category={}", category);
        }
    }

    #[test]
    fn test_category_stats_unfiltered() {
        let db = Database::in_memory().unwrap();
        seed_mixed_inbox(&db);

        let stats = service(&db).get_category_stats_as_of("acct", 7, today()).unwrap();
        assert_eq!(stats.total_emails, 700);
        assert_eq!(stats.days_with_data, 2);
        assert_eq!(stats.category_summaries.len(), 4);
        assert!(stats.summary("Personal").is_some());
    }
}
