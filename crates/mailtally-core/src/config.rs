//! Recommendation and aggregation settings
//!
//! `RecommendationConfig` is resolved once at startup and then shared (behind an
//! `Arc`) with the aggregator, the recommendation service and the retention job.
//! Nothing reads the environment after construction.
//!
//! Resolution order:
//! 1. Built-in defaults
//! 2. Optional TOML file (`MAILTALLY_CONFIG` or `--config`)
//! 3. Environment overrides:
//!    - `MAILTALLY_THRESHOLD_PERCENTAGE`
//!    - `MAILTALLY_MINIMUM_COUNT`
//!    - `MAILTALLY_EXCLUDED_CATEGORIES` (comma-separated)
//!    - `MAILTALLY_RETENTION_DAYS`
//!    - `MAILTALLY_BUFFER_FLUSH_SIZE`

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "MAILTALLY_CONFIG";

const THRESHOLD_ENV: &str = "MAILTALLY_THRESHOLD_PERCENTAGE";
const MINIMUM_COUNT_ENV: &str = "MAILTALLY_MINIMUM_COUNT";
const EXCLUDED_ENV: &str = "MAILTALLY_EXCLUDED_CATEGORIES";
const RETENTION_ENV: &str = "MAILTALLY_RETENTION_DAYS";
const FLUSH_SIZE_ENV: &str = "MAILTALLY_BUFFER_FLUSH_SIZE";

/// Categories never recommended for blocking unless configured otherwise
pub const DEFAULT_EXCLUDED_CATEGORIES: [&str; 3] =
    ["Personal", "Work-related", "Financial-Notification"];

/// Thresholds, exclusions and retention for the statistics engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationConfig {
    /// Minimum share of the inbox (percent) for a LOW recommendation
    pub threshold_percentage: f64,
    /// Categories with fewer emails in the window are never recommended
    pub minimum_count: u64,
    /// Categories that are never recommended
    pub excluded_categories: BTreeSet<String>,
    /// Tallies older than this many days are removed by the retention job
    pub retention_days: u32,
    /// Buffered single events that trigger an automatic flush
    pub buffer_flush_size: usize,
    /// Half-window change (percent) needed to call a trend increasing/decreasing
    pub trend_threshold_percentage: f64,
    /// Largest accepted analysis window in days
    pub max_window_days: u32,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            threshold_percentage: 10.0,
            minimum_count: 10,
            excluded_categories: DEFAULT_EXCLUDED_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            retention_days: 30,
            buffer_flush_size: 100,
            trend_threshold_percentage: 15.0,
            max_window_days: 30,
        }
    }
}

/// On-disk shape of the config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    threshold_percentage: Option<f64>,
    minimum_count: Option<u64>,
    excluded_categories: Option<Vec<String>>,
    retention_days: Option<u32>,
    buffer_flush_size: Option<usize>,
    trend_threshold_percentage: Option<f64>,
    max_window_days: Option<u32>,
}

impl RecommendationConfig {
    /// Resolve configuration from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.map(Path::to_path_buf).or_else(|| env_path.map(Into::into));

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file, filling unspecified fields with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded recommendation config file");
        Ok(config)
    }

    /// Parse TOML text, filling unspecified fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(v) = file.threshold_percentage {
            config.threshold_percentage = v;
        }
        if let Some(v) = file.minimum_count {
            config.minimum_count = v;
        }
        if let Some(v) = file.excluded_categories {
            config.excluded_categories = normalize_categories(v);
        }
        if let Some(v) = file.retention_days {
            config.retention_days = v;
        }
        if let Some(v) = file.buffer_flush_size {
            config.buffer_flush_size = v;
        }
        if let Some(v) = file.trend_threshold_percentage {
            config.trend_threshold_percentage = v;
        }
        if let Some(v) = file.max_window_days {
            config.max_window_days = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(THRESHOLD_ENV) {
            self.threshold_percentage = parse_value(THRESHOLD_ENV, &v)?;
        }
        if let Some(v) = lookup(MINIMUM_COUNT_ENV) {
            self.minimum_count = parse_value(MINIMUM_COUNT_ENV, &v)?;
        }
        if let Some(v) = lookup(EXCLUDED_ENV) {
            self.excluded_categories = normalize_categories(v.split(','));
            if self.excluded_categories.is_empty() {
                warn!("{} is empty, no categories are excluded", EXCLUDED_ENV);
            }
        }
        if let Some(v) = lookup(RETENTION_ENV) {
            self.retention_days = parse_value(RETENTION_ENV, &v)?;
        }
        if let Some(v) = lookup(FLUSH_SIZE_ENV) {
            self.buffer_flush_size = parse_value(FLUSH_SIZE_ENV, &v)?;
        }
        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.threshold_percentage) {
            return Err(Error::Config(format!(
                "threshold_percentage must be within 0-100, got {}",
                self.threshold_percentage
            )));
        }
        if !(0.0..=100.0).contains(&self.trend_threshold_percentage) {
            return Err(Error::Config(format!(
                "trend_threshold_percentage must be within 0-100, got {}",
                self.trend_threshold_percentage
            )));
        }
        if self.buffer_flush_size == 0 {
            return Err(Error::Config("buffer_flush_size must be at least 1".into()));
        }
        if self.retention_days == 0 {
            return Err(Error::Config("retention_days must be at least 1".into()));
        }
        if self.max_window_days == 0 {
            return Err(Error::Config("max_window_days must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether a category is on the never-recommend list
    pub fn is_excluded(&self, category: &str) -> bool {
        self.excluded_categories.contains(category)
    }

    /// Check an analysis window length against the allowed range
    pub fn validate_window(&self, days: u32) -> Result<()> {
        if days < 1 || days > self.max_window_days {
            return Err(Error::Validation(format!(
                "days must be between 1 and {}, got {}",
                self.max_window_days, days
            )));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, raw)))
}

fn normalize_categories<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
