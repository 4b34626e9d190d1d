//! Background retention of daily tallies
//!
//! Enabled by default; configured via environment variables:
//!
//! - `MAILTALLY_RETENTION_INTERVAL_HOURS`: Interval in hours (default: 24, 0 disables)
//!
//! How far back tallies are kept comes from `RecommendationConfig::retention_days`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use mailtally_core::{Database, RecommendationConfig, RetentionJob, RetentionReport};

/// Environment variable holding the retention interval in hours
pub const RETENTION_INTERVAL_ENV: &str = "MAILTALLY_RETENTION_INTERVAL_HOURS";

const DEFAULT_INTERVAL_HOURS: u64 = 24;

/// Configuration for scheduled retention runs
#[derive(Debug, Clone)]
pub struct RetentionScheduleConfig {
    /// Interval between runs in hours
    pub interval_hours: u64,
}

impl RetentionScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None when retention scheduling is disabled (interval 0)
    pub fn from_env() -> Option<Self> {
        Self::from_value(std::env::var(RETENTION_INTERVAL_ENV).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Option<Self> {
        let interval_hours = match value.map(str::trim) {
            None | Some("") => DEFAULT_INTERVAL_HOURS,
            Some(raw) => match raw.parse() {
                Ok(hours) => hours,
                Err(_) => {
                    warn!(
                        value = raw,
                        "{} is not a number, using {} hours",
                        RETENTION_INTERVAL_ENV,
                        DEFAULT_INTERVAL_HOURS
                    );
                    DEFAULT_INTERVAL_HOURS
                }
            },
        };

        if interval_hours == 0 {
            warn!("{} is 0, automatic retention disabled", RETENTION_INTERVAL_ENV);
            return None;
        }

        Some(Self { interval_hours })
    }
}

/// Start the retention scheduler as a background task
///
/// Runs once shortly after startup, then every `interval_hours`.
pub fn start_retention_scheduler(
    db: Database,
    config: Arc<RecommendationConfig>,
    schedule: RetentionScheduleConfig,
) {
    info!(
        "Starting retention scheduler: every {} hours, keeping {} days",
        schedule.interval_hours, config.retention_days
    );

    tokio::spawn(async move {
        let job = RetentionJob::new(Arc::new(db.clone()), config);
        let mut ticker = interval(Duration::from_secs(schedule.interval_hours * 3600));

        loop {
            // First tick completes immediately so expired data left by a long
            // shutdown is removed at startup
            ticker.tick().await;

            match run_scheduled_retention(&db, &job) {
                Ok(report) => {
                    info!(
                        cutoff = %report.cutoff,
                        deleted = report.deleted,
                        "Scheduled retention completed"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Scheduled retention failed");
                }
            }
        }
    });
}

/// Run a single scheduled retention pass
fn run_scheduled_retention(
    db: &Database,
    job: &RetentionJob,
) -> mailtally_core::Result<RetentionReport> {
    let report = job.run()?;

    // Log to audit (as "scheduler" user)
    if let Err(e) = db.log_audit(
        "scheduler",
        "retention",
        Some("daily_tally"),
        None,
        Some(&format!("cutoff={}, deleted={}", report.cutoff, report.deleted)),
    ) {
        warn!("Failed to log scheduled retention to audit: {}", e);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_interval() {
        let config = RetentionScheduleConfig::from_value(None).unwrap();
        assert_eq!(config.interval_hours, 24);
    }

    #[test]
    fn test_config_zero_disables() {
        assert!(RetentionScheduleConfig::from_value(Some("0")).is_none());
    }

    #[test]
    fn test_config_custom_and_invalid() {
        assert_eq!(
            RetentionScheduleConfig::from_value(Some("6"))
                .unwrap()
                .interval_hours,
            6
        );
        assert_eq!(
            RetentionScheduleConfig::from_value(Some("daily"))
                .unwrap()
                .interval_hours,
            24
        );
    }

    #[test]
    fn test_scheduled_run_is_audited() {
        let db = Database::in_memory().unwrap();
        let job = RetentionJob::new(
            Arc::new(db.clone()),
            Arc::new(RecommendationConfig::default()),
        );

        let report = run_scheduled_retention(&db, &job).unwrap();
        assert_eq!(report.deleted, 0);

        let audit = db.list_audit_log(10).unwrap();
        assert_eq!(audit[0].user, "scheduler");
        assert_eq!(audit[0].action, "retention");
    }
}
