//! Audit log operations

use rusqlite::{params, Row};
use serde::Serialize;

use super::Database;
use crate::error::Result;

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: Option<String>,
}

impl Database {
    /// Record an API or CLI action
    pub fn log_audit(
        &self,
        user: &str,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        details: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (user, action, entity_type, entity_id, details) VALUES (?, ?, ?, ?, ?)",
            params![user, action, entity_type, entity_id, details],
        )?;
        Ok(())
    }

    /// Most recent audit entries first
    pub fn list_audit_log(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, user, action, entity_type, entity_id, details FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![limit], audit_entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Most recent entries that touched one account (ingestion, reports, blocks)
    pub fn list_account_audit_log(&self, account_id: &str, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, user, action, entity_type, entity_id, details FROM audit_log WHERE entity_id = ? ORDER BY id DESC LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![account_id, limit], audit_entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn audit_entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        user: row.get(2)?,
        action: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        details: row.get(6)?,
    })
}
