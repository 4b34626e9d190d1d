//! Storage seams used by the aggregator, the recommendation service and the
//! retention job
//!
//! `Database` implements both traits. Keeping the engine behind traits lets a
//! process swap in another transactional store without touching the engine.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::{AggregatedTally, DailyTally};
use crate::trend::TrendAnalyzer;

/// Persistence for per-account, per-day category tallies
///
/// Implementations must make `save_daily_tally` and `merge_daily_counts`
/// atomic per (account, date). `merge_daily_counts` is what the aggregator
/// flushes through: it must add to the stored counts without a separate read,
/// so several aggregators or processes sharing one store lose nothing.
pub trait TallyStore: Send + Sync {
    /// Upsert the full tally keyed by (account_id, tally_date)
    fn save_daily_tally(&self, tally: &DailyTally) -> Result<()>;

    /// Add counts to (account_id, date) and return the merged tally
    fn merge_daily_counts(
        &self,
        account_id: &str,
        date: NaiveDate,
        counts: &HashMap<String, u64>,
    ) -> Result<DailyTally>;

    fn get_tally(&self, account_id: &str, date: NaiveDate) -> Result<Option<DailyTally>>;

    /// Inclusive range, ascending by date
    fn get_tallies_for_period(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTally>>;

    /// Per-category sums over an inclusive range, trends classified by `analyzer`
    fn get_aggregated_tallies_with(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        analyzer: &TrendAnalyzer,
    ) -> Result<AggregatedTally>;

    fn get_aggregated_tallies(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregatedTally> {
        self.get_aggregated_tallies_with(account_id, start, end, &TrendAnalyzer::new())
    }

    /// Returns the number of account-day tallies removed
    fn delete_tallies_before(&self, cutoff: NaiveDate) -> Result<usize>;
}

/// Read-only view of the categories an account has already blocked
pub trait BlockedCategorySource: Send + Sync {
    fn blocked_categories(&self, account_id: &str) -> Result<BTreeSet<String>>;
}

impl TallyStore for Database {
    fn save_daily_tally(&self, tally: &DailyTally) -> Result<()> {
        Database::save_daily_tally(self, tally)
    }

    fn merge_daily_counts(
        &self,
        account_id: &str,
        date: NaiveDate,
        counts: &HashMap<String, u64>,
    ) -> Result<DailyTally> {
        Database::merge_daily_counts(self, account_id, date, counts)
    }

    fn get_tally(&self, account_id: &str, date: NaiveDate) -> Result<Option<DailyTally>> {
        Database::get_tally(self, account_id, date)
    }

    fn get_tallies_for_period(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTally>> {
        Database::get_tallies_for_period(self, account_id, start, end)
    }

    fn get_aggregated_tallies_with(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        analyzer: &TrendAnalyzer,
    ) -> Result<AggregatedTally> {
        Database::get_aggregated_tallies_with(self, account_id, start, end, analyzer)
    }

    fn delete_tallies_before(&self, cutoff: NaiveDate) -> Result<usize> {
        Database::delete_tallies_before(self, cutoff)
    }
}

impl BlockedCategorySource for Database {
    fn blocked_categories(&self, account_id: &str) -> Result<BTreeSet<String>> {
        self.get_blocked_categories(account_id)
    }
}
