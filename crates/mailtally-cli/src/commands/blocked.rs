//! Blocked category command implementations

use anyhow::{bail, Result};
use mailtally_core::db::Database;

pub fn cmd_block(db: &Database, account_id: &str, category: &str) -> Result<()> {
    db.require_account(account_id)?;
    let blocked = db.block_category(account_id, category)?;
    db.log_audit(
        "cli",
        "block",
        Some("blocked_category"),
        Some(account_id),
        Some(&format!("category={}", blocked.category)),
    )?;

    println!("🚫 Blocked {} for {}", blocked.category, account_id);
    Ok(())
}

pub fn cmd_unblock(db: &Database, account_id: &str, category: &str) -> Result<()> {
    if !db.unblock_category(account_id, category)? {
        bail!("{} is not blocked for {}", category, account_id);
    }
    db.log_audit(
        "cli",
        "unblock",
        Some("blocked_category"),
        Some(account_id),
        Some(&format!("category={}", category)),
    )?;

    println!("✅ Unblocked {} for {}", category, account_id);
    Ok(())
}
