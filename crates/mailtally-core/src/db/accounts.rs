//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create an account, or return the existing one with the same id
    pub fn create_account(
        &self,
        id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<Account> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::Validation("account id must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (id, email, display_name) VALUES (?, ?, ?) ON CONFLICT(id) DO NOTHING",
            params![id, email, display_name],
        )?;
        drop(conn);

        self.get_account(id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, email, display_name, created_at FROM accounts ORDER BY id")?;

        let accounts = stmt
            .query_map([], Self::map_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, email, display_name, created_at FROM accounts WHERE id = ?",
                params![id],
                Self::map_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Get an account by ID, failing with `NotFound` when it does not exist
    pub fn require_account(&self, id: &str) -> Result<Account> {
        self.get_account(id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }

    /// Delete an account together with its tallies and blocked categories
    ///
    /// Returns false when the account did not exist.
    pub fn delete_account(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM daily_category_tallies WHERE account_id = ?",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM blocked_categories WHERE account_id = ?",
            params![id],
        )?;
        let deleted = tx.execute("DELETE FROM accounts WHERE id = ?", params![id])?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    fn map_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        let created_at_str: String = row.get(3)?;
        Ok(Account {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
