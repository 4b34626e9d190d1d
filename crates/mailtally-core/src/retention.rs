//! Scheduled removal of tallies that fell out of the retention window

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::RecommendationConfig;
use crate::error::Result;
use crate::store::TallyStore;

/// Result of one retention pass
#[derive(Debug, Clone, Serialize)]
pub struct RetentionReport {
    /// Tallies dated strictly before this day were removed
    pub cutoff: NaiveDate,
    /// Account-day tallies removed
    pub deleted: usize,
}

/// Deletes tallies older than `retention_days`
///
/// Shares no state with the aggregator; safe to run while the pipeline writes.
pub struct RetentionJob {
    store: Arc<dyn TallyStore>,
    config: Arc<RecommendationConfig>,
}

impl RetentionJob {
    pub fn new(store: Arc<dyn TallyStore>, config: Arc<RecommendationConfig>) -> Self {
        Self { store, config }
    }

    /// First day that is kept
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.config.retention_days))
    }

    pub fn run(&self) -> Result<RetentionReport> {
        self.run_as_of(Utc::now().date_naive())
    }

    pub fn run_as_of(&self, today: NaiveDate) -> Result<RetentionReport> {
        let cutoff = self.cutoff(today);
        let deleted = self.store.delete_tallies_before(cutoff)?;

        info!(
            cutoff = %cutoff,
            deleted,
            retention_days = self.config.retention_days,
            "Retention pass complete"
        );

        Ok(RetentionReport { cutoff, deleted })
    }
}
