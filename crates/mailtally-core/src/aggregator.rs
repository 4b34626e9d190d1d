//! In-process buffering of category counts ahead of the tally store
//!
//! The pipeline reports what it categorized; the aggregator folds those
//! events into per-(account, day) maps and merges them into storage on flush.
//! One aggregator is meant to be shared by every pipeline worker in the process.
//!
//! Two entry points:
//! - `record_category` buffers a single email and flushes once
//!   `buffer_flush_size` events are pending.
//! - `record_batch` merges a whole processing run and flushes immediately, so
//!   a run is durable before the caller moves on. Batch calls therefore barely
//!   use the buffer; it mostly serves the single-event path and holds keys
//!   whose last flush failed.
//!
//! Flushing runs under the same mutex that guards the buffer, so writes from
//! one aggregator reach the store one at a time. Each key is written with
//! [`TallyStore::merge_daily_counts`], an additive upsert, so other
//! aggregators or processes writing the same store do not lose counts either.
//!
//! Counts that could never be stored (an account-day above
//! [`MAX_DAILY_COUNT`]) are rejected with `Error::Validation` before anything
//! is buffered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RecommendationConfig;
use crate::error::{Error, Result};
use crate::models::MAX_DAILY_COUNT;
use crate::store::TallyStore;

/// Buffer key: one account on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BufferKey {
    pub account_id: String,
    pub date: NaiveDate,
}

impl BufferKey {
    pub fn new(account_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            account_id: account_id.into(),
            date,
        }
    }
}

/// A buffered key that could not be written
#[derive(Debug, Clone, Serialize)]
pub struct FlushFailure {
    pub account_id: String,
    pub date: NaiveDate,
    pub error: String,
    /// Still buffered for the next flush (storage trouble). False when the
    /// store rejected the counts outright and they were dropped.
    pub retained: bool,
}

/// Outcome of one flush pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlushReport {
    /// Keys merged into the store
    pub keys_flushed: usize,
    /// Emails written across all flushed keys
    pub emails_flushed: u64,
    /// Keys that could not be written
    pub failures: Vec<FlushFailure>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn sum_counts<'a>(counts: impl IntoIterator<Item = &'a u64>) -> u64 {
    counts
        .into_iter()
        .fold(0u64, |total, n| total.saturating_add(*n))
}

fn exceeds_daily_max(key: &BufferKey) -> Error {
    Error::Validation(format!(
        "counts for {} on {} exceed the daily maximum of {}",
        key.account_id, key.date, MAX_DAILY_COUNT
    ))
}

#[derive(Default)]
struct Buffer {
    entries: HashMap<BufferKey, HashMap<String, u64>>,
    pending_events: u64,
}

impl Buffer {
    /// Buffer counts for one key. Either all of them are taken or none are.
    fn add<'a, I>(&mut self, key: BufferKey, counts: I) -> Result<u64>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut staged: HashMap<String, u64> = HashMap::new();
        let mut added: u64 = 0;

        for (category, count) in counts {
            let category = category.trim();
            if count == 0 {
                continue;
            }
            if category.is_empty() {
                warn!(account_id = %key.account_id, "Ignoring count for empty category name");
                continue;
            }
            added = added
                .checked_add(count)
                .ok_or_else(|| exceeds_daily_max(&key))?;
            *staged.entry(category.to_string()).or_insert(0) += count;
        }

        if added == 0 {
            return Ok(0);
        }

        let buffered = self.entries.get(&key).map_or(0, |c| sum_counts(c.values()));
        match buffered.checked_add(added) {
            Some(total) if total <= MAX_DAILY_COUNT => {}
            _ => return Err(exceeds_daily_max(&key)),
        }

        // Bounded by the key total checked above
        let entry = self.entries.entry(key).or_default();
        for (category, count) in staged {
            *entry.entry(category).or_insert(0) += count;
        }
        self.pending_events = self.pending_events.saturating_add(added);
        Ok(added)
    }
}

/// Buffers category counts and merges them into a [`TallyStore`]
pub struct CategoryAggregator {
    store: Arc<dyn TallyStore>,
    config: Arc<RecommendationConfig>,
    buffer: Mutex<Buffer>,
}

impl CategoryAggregator {
    pub fn new(store: Arc<dyn TallyStore>, config: Arc<RecommendationConfig>) -> Self {
        Self {
            store,
            config,
            buffer: Mutex::new(Buffer::default()),
        }
    }

    /// Count one categorized email.
    ///
    /// Returns the flush report when this event pushed the buffer to
    /// `buffer_flush_size` and a flush ran.
    pub fn record_category(
        &self,
        account_id: &str,
        category: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<FlushReport>> {
        let mut buffer = self.lock();
        buffer.add(
            BufferKey::new(account_id, timestamp.date_naive()),
            [(category, 1)],
        )?;

        if buffer.pending_events >= self.config.buffer_flush_size as u64 {
            debug!(
                pending = buffer.pending_events,
                threshold = self.config.buffer_flush_size,
                "Buffer threshold reached"
            );
            Ok(Some(self.flush_locked(&mut buffer)))
        } else {
            Ok(None)
        }
    }

    /// Merge the counts of one completed processing run, then flush.
    ///
    /// A run whose counts cannot be stored is rejected as a whole and leaves
    /// the buffer untouched.
    pub fn record_batch<'a, I>(
        &self,
        account_id: &str,
        category_counts: I,
        timestamp: DateTime<Utc>,
    ) -> Result<FlushReport>
    where
        I: IntoIterator<Item = (&'a String, &'a u64)>,
    {
        let key = BufferKey::new(account_id, timestamp.date_naive());
        let mut buffer = self.lock();
        buffer.add(
            key,
            category_counts
                .into_iter()
                .map(|(category, count)| (category.as_str(), *count)),
        )?;
        Ok(self.flush_locked(&mut buffer))
    }

    /// Merge every buffered key into the store.
    ///
    /// Never fails as a whole. A key that hits a storage error stays buffered
    /// for the next flush; a key the store rejects is dropped. Both are listed
    /// in the report.
    pub fn flush(&self) -> FlushReport {
        let mut buffer = self.lock();
        self.flush_locked(&mut buffer)
    }

    /// Emails buffered and not yet written
    pub fn pending_events(&self) -> u64 {
        self.lock().pending_events
    }

    /// Keys currently holding buffered counts, sorted
    pub fn pending_keys(&self) -> Vec<BufferKey> {
        let mut keys: Vec<BufferKey> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // Buffer mutations cannot panic midway, so a poisoned lock still holds consistent data
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush_locked(&self, buffer: &mut Buffer) -> FlushReport {
        let mut report = FlushReport::default();
        if buffer.entries.is_empty() {
            return report;
        }

        let mut keys: Vec<BufferKey> = buffer.entries.keys().cloned().collect();
        keys.sort();

        for key in keys {
            let Some(counts) = buffer.entries.get(&key) else {
                continue;
            };

            match self.merge_into_store(&key, counts) {
                Ok(written) => {
                    buffer.entries.remove(&key);
                    report.keys_flushed += 1;
                    report.emails_flushed = report.emails_flushed.saturating_add(written);
                }
                Err(e) => {
                    let retained = e.is_storage();
                    if retained {
                        warn!(
                            account_id = %key.account_id,
                            date = %key.date,
                            error = %e,
                            "Flush failed, keeping counts buffered for retry"
                        );
                    } else {
                        warn!(
                            account_id = %key.account_id,
                            date = %key.date,
                            error = %e,
                            "Store rejected buffered counts, dropping them"
                        );
                        buffer.entries.remove(&key);
                    }
                    report.failures.push(FlushFailure {
                        account_id: key.account_id.clone(),
                        date: key.date,
                        error: e.to_string(),
                        retained,
                    });
                }
            }
        }

        buffer.pending_events = buffer
            .entries
            .values()
            .map(|counts| sum_counts(counts.values()))
            .fold(0u64, u64::saturating_add);

        if report.keys_flushed > 0 {
            info!(
                keys = report.keys_flushed,
                emails = report.emails_flushed,
                failed = report.failures.len(),
                "Flushed category tallies"
            );
        }

        report
    }

    /// Add one key's counts to the store; returns the number of emails added
    fn merge_into_store(&self, key: &BufferKey, counts: &HashMap<String, u64>) -> Result<u64> {
        let merged = self
            .store
            .merge_daily_counts(&key.account_id, key.date, counts)?;

        debug!(
            account_id = %key.account_id,
            date = %key.date,
            total = merged.total_emails(),
            "Merged buffered counts"
        );
        Ok(sum_counts(counts.values()))
    }
}
