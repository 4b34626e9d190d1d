//! Domain models for mailtally

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A mailbox account whose emails are categorized by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A category the account owner has already blocked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedCategory {
    pub account_id: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Largest email count one account-day may hold, per category and in total.
///
/// Counts are stored as SQLite integers, so anything above `i64::MAX` cannot
/// be persisted.
pub const MAX_DAILY_COUNT: u64 = i64::MAX as u64;

/// Accumulated category counts for one account on one calendar day
///
/// `total_emails` is never set directly: every constructor and mutation
/// recomputes it from `category_counts`, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTally {
    pub account_id: String,
    pub tally_date: NaiveDate,
    category_counts: BTreeMap<String, u64>,
    total_emails: u64,
}

impl DailyTally {
    /// An empty tally for an account-day
    pub fn new(account_id: impl Into<String>, tally_date: NaiveDate) -> Self {
        Self {
            account_id: account_id.into(),
            tally_date,
            category_counts: BTreeMap::new(),
            total_emails: 0,
        }
    }

    /// Build a tally from existing counts. Zero counts are dropped.
    pub fn from_counts<I, S>(account_id: impl Into<String>, tally_date: NaiveDate, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut tally = Self::new(account_id, tally_date);
        tally.merge_counts(counts);
        tally
    }

    /// Additively merge counts into this tally and recompute the total.
    ///
    /// Saturates at `u64::MAX`; callers that persist the tally check
    /// [`MAX_DAILY_COUNT`] first.
    pub fn merge_counts<I, S>(&mut self, counts: I)
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        for (category, count) in counts {
            if count == 0 {
                continue;
            }
            let slot = self.category_counts.entry(category.into()).or_insert(0);
            *slot = slot.saturating_add(count);
        }
        self.total_emails = self
            .category_counts
            .values()
            .fold(0u64, |total, n| total.saturating_add(*n));
    }

    pub fn category_counts(&self) -> &BTreeMap<String, u64> {
        &self.category_counts
    }

    pub fn total_emails(&self) -> u64 {
        self.total_emails
    }

    /// Count for one category (0 when absent)
    pub fn count(&self, category: &str) -> u64 {
        self.category_counts.get(category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_emails == 0
    }
}

/// Direction of a category's volume over the analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::str::FromStr for TrendDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increasing" => Ok(Self::Increasing),
            "decreasing" => Ok(Self::Decreasing),
            "stable" => Ok(Self::Stable),
            _ => Err(format!("Unknown trend direction: {}", s)),
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-category totals over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_count: u64,
    /// Share of all emails in the window (0 when the window is empty)
    pub percentage: f64,
    /// Emails per day that has data (0 when no day has data)
    pub daily_average: f64,
    pub trend: TrendDirection,
}

/// Read-only summary of an account's tallies over `[start_date, end_date]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTally {
    pub account_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_emails: u64,
    /// Distinct dates with at least one tally row (not the calendar span)
    pub days_with_data: u32,
    /// Sorted by total_count descending, then category name
    pub category_summaries: Vec<CategorySummary>,
}

impl AggregatedTally {
    pub fn empty(account_id: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            account_id: account_id.into(),
            start_date,
            end_date,
            total_emails: 0,
            days_with_data: 0,
            category_summaries: vec![],
        }
    }

    pub fn summary(&self, category: &str) -> Option<&CategorySummary> {
        self.category_summaries
            .iter()
            .find(|s| s.category == category)
    }
}

/// How strongly a category is recommended for blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationStrength {
    Low,
    Medium,
    High,
}

impl RecommendationStrength {
    /// Share of the inbox at or above which a recommendation is HIGH
    pub const HIGH_PERCENTAGE: f64 = 25.0;
    /// Share of the inbox at or above which a recommendation is MEDIUM
    pub const MEDIUM_PERCENTAGE: f64 = 15.0;

    /// Tier for a percentage share, or None when below the LOW threshold
    pub fn from_percentage(percentage: f64, low_threshold: f64) -> Option<Self> {
        if percentage >= Self::HIGH_PERCENTAGE {
            Some(Self::High)
        } else if percentage >= Self::MEDIUM_PERCENTAGE {
            Some(Self::Medium)
        } else if percentage >= low_threshold {
            Some(Self::Low)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for RecommendationStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single "consider blocking this category" suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingRecommendation {
    pub category: String,
    pub strength: RecommendationStrength,
    pub email_count: u64,
    pub percentage: f64,
    pub reason: String,
}

/// Recommendations for one account over a rolling window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub account_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub days: u32,
    pub total_emails_analyzed: u64,
    /// Ordered by email count descending, then category name
    pub recommendations: Vec<BlockingRecommendation>,
    /// Blocked categories that had emails in the window
    pub already_blocked: BTreeSet<String>,
    pub generated_at: DateTime<Utc>,
}

/// Count for one day of a category's breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Another category's share, shown next to a recommendation for context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub total_count: u64,
    pub percentage: f64,
}

/// Detailed reasoning behind one category's recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReason {
    pub account_id: String,
    pub category: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub days: u32,
    pub total_count: u64,
    pub percentage: f64,
    pub daily_average: f64,
    pub strength: RecommendationStrength,
    pub reason: String,
    /// Chronologically ascending
    pub daily_breakdown: Vec<DailyCount>,
    pub trend_direction: TrendDirection,
    pub trend_percentage_change: f64,
    pub comparable_categories: Vec<CategoryShare>,
    pub recommendation_factors: Vec<String>,
}

/// `count / total * 100`, or 0 for an empty total
pub fn percentage_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
