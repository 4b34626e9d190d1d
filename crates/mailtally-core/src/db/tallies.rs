//! Daily category tallies: upsert, range reads, aggregates and retention deletes

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use super::{parse_date, Database};
use crate::error::{Error, Result};
use crate::models::{percentage_of, AggregatedTally, CategorySummary, DailyTally, MAX_DAILY_COUNT};
use crate::trend::TrendAnalyzer;

/// Overall size of the tally table (for status output)
#[derive(Debug, Clone, Serialize)]
pub struct TallyStats {
    pub accounts: i64,
    pub account_days: i64,
    pub oldest_date: Option<NaiveDate>,
    pub newest_date: Option<NaiveDate>,
}

fn to_db_count(count: u64) -> Result<i64> {
    i64::try_from(count).map_err(|_| Error::Validation(format!("count too large: {}", count)))
}

fn check_day_total(account_id: &str, date: NaiveDate, total: Option<u64>) -> Result<u64> {
    match total {
        Some(total) if total <= MAX_DAILY_COUNT => Ok(total),
        _ => Err(Error::Validation(format!(
            "daily count for {} on {} would exceed {}",
            account_id, date, MAX_DAILY_COUNT
        ))),
    }
}

fn from_db_count(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| Error::InvalidData(format!("negative stored count: {}", count)))
}

impl Database {
    /// Store the full tally for (account, date), replacing what was there
    ///
    /// Runs in an IMMEDIATE transaction so concurrent writers for the same key
    /// serialize on the database write lock instead of interleaving.
    pub fn save_daily_tally(&self, tally: &DailyTally) -> Result<()> {
        let total = tally
            .category_counts()
            .values()
            .try_fold(0u64, |total, n| total.checked_add(*n));
        check_day_total(&tally.account_id, tally.tally_date, total)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let date = tally.tally_date.to_string();

        let existing: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT category FROM daily_category_tallies WHERE account_id = ? AND tally_date = ?",
            )?;
            let rows = stmt.query_map(params![tally.account_id, date], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        for category in existing
            .iter()
            .filter(|c| !tally.category_counts().contains_key(*c))
        {
            tx.execute(
                "DELETE FROM daily_category_tallies WHERE account_id = ? AND tally_date = ? AND category = ?",
                params![tally.account_id, date, category],
            )?;
        }

        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO daily_category_tallies (account_id, tally_date, category, count)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(account_id, tally_date, category)
                DO UPDATE SET count = excluded.count, updated_at = CURRENT_TIMESTAMP
                "#,
            )?;
            for (category, count) in tally.category_counts() {
                upsert.execute(params![tally.account_id, date, category, to_db_count(*count)?])?;
            }
        }

        tx.commit()?;

        debug!(
            account_id = %tally.account_id,
            date = %tally.tally_date,
            total = tally.total_emails(),
            "Saved daily tally"
        );
        Ok(())
    }

    /// Atomically add counts to (account, date) at the storage layer
    ///
    /// The read of the current day and the increments share one IMMEDIATE
    /// transaction, so writers in other processes (or other aggregators) never
    /// lose each other's counts. Fails with `Error::Validation`, leaving the
    /// stored day untouched, when the result would exceed `MAX_DAILY_COUNT`.
    pub fn merge_daily_counts(
        &self,
        account_id: &str,
        date: NaiveDate,
        counts: &HashMap<String, u64>,
    ) -> Result<DailyTally> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let date_str = date.to_string();

        let current_total = load_tally(&tx, account_id, date)?.map_or(0, |t| t.total_emails());
        let total = counts
            .values()
            .try_fold(current_total, |total, n| total.checked_add(*n));
        check_day_total(account_id, date, total)?;

        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO daily_category_tallies (account_id, tally_date, category, count)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(account_id, tally_date, category)
                DO UPDATE SET count = count + excluded.count, updated_at = CURRENT_TIMESTAMP
                "#,
            )?;
            for (category, count) in counts.iter().filter(|(_, c)| **c > 0) {
                upsert.execute(params![account_id, date_str, category, to_db_count(*count)?])?;
            }
        }

        let merged = load_tally(&tx, account_id, date)?
            .unwrap_or_else(|| DailyTally::new(account_id, date));
        tx.commit()?;

        debug!(
            account_id = %account_id,
            date = %date,
            total = merged.total_emails(),
            "Merged daily counts"
        );
        Ok(merged)
    }

    /// Get the tally for one account-day
    pub fn get_tally(&self, account_id: &str, date: NaiveDate) -> Result<Option<DailyTally>> {
        let conn = self.conn()?;
        load_tally(&conn, account_id, date)
    }

    /// Tallies for an inclusive date range, ascending by date
    pub fn get_tallies_for_period(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTally>> {
        let conn = self.conn()?;
        load_period(&conn, account_id, start, end)
    }

    /// Sum each category across an inclusive date range
    pub fn get_aggregated_tallies(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregatedTally> {
        self.get_aggregated_tallies_with(account_id, start, end, &TrendAnalyzer::new())
    }

    /// Same as [`get_aggregated_tallies`](Self::get_aggregated_tallies) with a
    /// caller-supplied trend analyzer
    pub fn get_aggregated_tallies_with(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        analyzer: &TrendAnalyzer,
    ) -> Result<AggregatedTally> {
        let conn = self.conn()?;
        let (from, to) = (start.to_string(), end.to_string());

        let totals: Vec<(String, i64)> = {
            let mut stmt = conn.prepare(
                r#"
                SELECT category, SUM(count) AS total
                FROM daily_category_tallies
                WHERE account_id = ?1 AND tally_date BETWEEN ?2 AND ?3
                GROUP BY category
                HAVING total > 0
                "#,
            )?;
            let rows = stmt.query_map(params![account_id, from, to], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        if totals.is_empty() {
            return Ok(AggregatedTally::empty(account_id, start, end));
        }

        let days_with_data: i64 = conn.query_row(
            r#"
            SELECT COUNT(DISTINCT tally_date)
            FROM daily_category_tallies
            WHERE account_id = ?1 AND tally_date BETWEEN ?2 AND ?3 AND count > 0
            "#,
            params![account_id, from, to],
            |row| row.get(0),
        )?;
        let days_with_data = u32::try_from(days_with_data).unwrap_or(u32::MAX);

        let mut category_totals = Vec::with_capacity(totals.len());
        for (category, total) in totals {
            category_totals.push((category, from_db_count(total)?));
        }
        let total_emails: u64 = category_totals.iter().map(|(_, t)| *t).sum();

        // Trend series: one point per day with data, 0 when the category is absent that day
        let period = load_period(&conn, account_id, start, end)?;

        let mut category_summaries: Vec<CategorySummary> = category_totals
            .into_iter()
            .map(|(category, total_count)| {
                let counts: Vec<u64> = period.iter().map(|t| t.count(&category)).collect();
                let trend = analyzer.analyze_counts(&counts);
                CategorySummary {
                    percentage: percentage_of(total_count, total_emails),
                    daily_average: if days_with_data > 0 {
                        total_count as f64 / days_with_data as f64
                    } else {
                        0.0
                    },
                    trend: trend.direction,
                    category,
                    total_count,
                }
            })
            .collect();

        category_summaries.sort_by(|a, b| {
            b.total_count
                .cmp(&a.total_count)
                .then_with(|| a.category.cmp(&b.category))
        });

        Ok(AggregatedTally {
            account_id: account_id.to_string(),
            start_date: start,
            end_date: end,
            total_emails,
            days_with_data,
            category_summaries,
        })
    }

    /// Delete every tally dated before `cutoff` (all accounts)
    ///
    /// Returns the number of account-day tallies removed.
    pub fn delete_tallies_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cutoff_str = cutoff.to_string();

        let account_days: i64 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT account_id, tally_date
                FROM daily_category_tallies
                WHERE tally_date < ?
            )
            "#,
            params![cutoff_str],
            |row| row.get(0),
        )?;

        tx.execute(
            "DELETE FROM daily_category_tallies WHERE tally_date < ?",
            params![cutoff_str],
        )?;
        tx.commit()?;

        Ok(usize::try_from(account_days).unwrap_or(0))
    }

    /// Size of the tally table
    pub fn tally_stats(&self) -> Result<TallyStats> {
        let conn = self.conn()?;
        let (accounts, account_days, oldest, newest): (i64, i64, Option<String>, Option<String>) =
            conn.query_row(
                r#"
                SELECT
                    COUNT(DISTINCT account_id),
                    (SELECT COUNT(*) FROM (SELECT DISTINCT account_id, tally_date FROM daily_category_tallies)),
                    MIN(tally_date),
                    MAX(tally_date)
                FROM daily_category_tallies
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(TallyStats {
            accounts,
            account_days,
            oldest_date: oldest.as_deref().map(parse_date).transpose()?,
            newest_date: newest.as_deref().map(parse_date).transpose()?,
        })
    }
}

/// Load one account-day; None when it has no rows
fn load_tally(conn: &Connection, account_id: &str, date: NaiveDate) -> Result<Option<DailyTally>> {
    let mut stmt = conn.prepare(
        "SELECT category, count FROM daily_category_tallies WHERE account_id = ? AND tally_date = ?",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![account_id, date.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut counts = Vec::with_capacity(rows.len());
    for (category, count) in rows {
        counts.push((category, from_db_count(count)?));
    }
    Ok(Some(DailyTally::from_counts(account_id, date, counts)))
}

/// Load all tallies for an inclusive range, ascending by date
fn load_period(
    conn: &Connection,
    account_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyTally>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT tally_date, category, count
        FROM daily_category_tallies
        WHERE account_id = ?1 AND tally_date BETWEEN ?2 AND ?3
        ORDER BY tally_date, category
        "#,
    )?;
    let rows: Vec<(String, String, i64)> = stmt
        .query_map(params![account_id, start.to_string(), end.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_date: BTreeMap<NaiveDate, Vec<(String, u64)>> = BTreeMap::new();
    for (date, category, count) in rows {
        by_date
            .entry(parse_date(&date)?)
            .or_default()
            .push((category, from_db_count(count)?));
    }

    Ok(by_date
        .into_iter()
        .map(|(date, counts)| DailyTally::from_counts(account_id, date, counts))
        .filter(|t| !t.is_empty())
        .collect())
}
