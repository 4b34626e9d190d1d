//! Blocked category operations

use std::collections::BTreeSet;

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::BlockedCategory;

impl Database {
    /// Mark a category as blocked for an account (idempotent)
    pub fn block_category(&self, account_id: &str, category: &str) -> Result<BlockedCategory> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::Validation("category must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO blocked_categories (account_id, category) VALUES (?, ?) ON CONFLICT(account_id, category) DO NOTHING",
            params![account_id, category],
        )?;

        let created_at: String = conn.query_row(
            "SELECT created_at FROM blocked_categories WHERE account_id = ? AND category = ?",
            params![account_id, category],
            |row| row.get(0),
        )?;

        Ok(BlockedCategory {
            account_id: account_id.to_string(),
            category: category.to_string(),
            created_at: parse_datetime(&created_at),
        })
    }

    /// Remove a block. Returns false when the category was not blocked.
    pub fn unblock_category(&self, account_id: &str, category: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM blocked_categories WHERE account_id = ? AND category = ?",
            params![account_id, category.trim()],
        )?;
        Ok(deleted > 0)
    }

    /// Blocked categories for an account, with timestamps
    pub fn list_blocked_categories(&self, account_id: &str) -> Result<Vec<BlockedCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, category, created_at FROM blocked_categories WHERE account_id = ? ORDER BY category",
        )?;

        let blocked = stmt
            .query_map(params![account_id], |row| {
                let created_at: String = row.get(2)?;
                Ok(BlockedCategory {
                    account_id: row.get(0)?,
                    category: row.get(1)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(blocked)
    }

    /// Just the category names blocked for an account
    pub fn get_blocked_categories(&self, account_id: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .list_blocked_categories(account_id)?
            .into_iter()
            .map(|b| b.category)
            .collect())
    }
}
