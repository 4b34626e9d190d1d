//! Account command implementations

use anyhow::{bail, Context, Result};
use mailtally_core::db::Database;

use super::truncate;

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts().context("Failed to list accounts")?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with: mailtally accounts add <id>");
        return Ok(());
    }

    println!();
    println!("📬 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");
    for account in &accounts {
        let label = account
            .display_name
            .as_deref()
            .or(account.email.as_deref())
            .unwrap_or("-");
        println!(
            "   {:<24} {:<30} since {}",
            truncate(&account.id, 24),
            truncate(label, 30),
            account.created_at.format("%Y-%m-%d")
        );
    }
    println!();
    println!("   {} account(s)", accounts.len());

    Ok(())
}

pub fn cmd_accounts_add(
    db: &Database,
    id: &str,
    email: Option<&str>,
    display_name: Option<&str>,
) -> Result<()> {
    let account = db.create_account(id, email, display_name)?;
    db.log_audit("cli", "create", Some("account"), Some(&account.id), None)?;

    println!("✅ Account ready: {}", account.id);
    Ok(())
}

pub fn cmd_accounts_delete(db: &Database, id: &str) -> Result<()> {
    if !db.delete_account(id)? {
        bail!("Account not found: {}", id);
    }
    db.log_audit("cli", "delete", Some("account"), Some(id), None)?;

    println!("🗑️  Deleted account {} with its tallies and blocked categories", id);
    Ok(())
}
