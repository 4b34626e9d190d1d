//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::{Duration, Utc};
use mailtally_core::db::Database;
use mailtally_core::models::DailyTally;
use mailtally_core::RecommendationConfig;

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.create_account("acct-1", None, Some("Test inbox")).unwrap();
    db
}

fn seed_recent(db: &Database) {
    let today = Utc::now().date_naive();
    db.save_daily_tally(&DailyTally::from_counts(
        "acct-1",
        today - Duration::days(1),
        [("Marketing", 60), ("Personal", 20), ("Social", 20)],
    ))
    .unwrap();
}

// ========== Record Command Tests ==========

#[test]
fn test_parse_count_pair() {
    assert_eq!(
        commands::parse_count_pair("Marketing=45").unwrap(),
        ("Marketing".to_string(), 45)
    );
    assert_eq!(
        commands::parse_count_pair(" Work-related = 8 ").unwrap(),
        ("Work-related".to_string(), 8)
    );
    assert!(commands::parse_count_pair("Marketing").is_err());
    assert!(commands::parse_count_pair("=4").is_err());
    assert!(commands::parse_count_pair("Marketing=-4").is_err());
}

#[test]
fn test_cmd_record() {
    let db = setup_test_db();
    let config = RecommendationConfig::default();
    let pairs: Vec<String> = ["Marketing=45", "Advertising=32", "Marketing=5"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    commands::cmd_record(&db, &config, "acct-1", &pairs, Some("2025-11-28")).unwrap();

    let date = chrono::NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
    let tally = db.get_tally("acct-1", date).unwrap().unwrap();
    assert_eq!(tally.count("Marketing"), 50);
    assert_eq!(tally.count("Advertising"), 32);
    assert_eq!(tally.total_emails(), 82);

    // Recording again merges
    commands::cmd_record(&db, &config, "acct-1", &pairs[..1], Some("2025-11-28")).unwrap();
    let tally = db.get_tally("acct-1", date).unwrap().unwrap();
    assert_eq!(tally.count("Marketing"), 95);
}

#[test]
fn test_cmd_record_rejects_bad_input() {
    let db = setup_test_db();
    let config = RecommendationConfig::default();
    let pairs = vec!["Marketing=1".to_string()];

    assert!(commands::cmd_record(&db, &config, "nobody", &pairs, None).is_err());
    assert!(commands::cmd_record(&db, &config, "acct-1", &pairs, Some("28/11/2025")).is_err());
    assert!(db.tally_stats().unwrap().account_days == 0);
}

#[test]
fn test_cmd_record_rejects_unstorable_counts() {
    let db = setup_test_db();
    let config = RecommendationConfig::default();

    let huge = vec![format!("Spam={}", u64::MAX)];
    assert!(commands::cmd_record(&db, &config, "acct-1", &huge, Some("2025-11-28")).is_err());

    let overflowing = vec![format!("Spam={}", u64::MAX), "Spam=1".to_string()];
    assert!(
        commands::cmd_record(&db, &config, "acct-1", &overflowing, Some("2025-11-28")).is_err()
    );
    assert_eq!(db.tally_stats().unwrap().account_days, 0);

    // The day still accepts ordinary runs
    let ok = vec!["Marketing=3".to_string()];
    commands::cmd_record(&db, &config, "acct-1", &ok, Some("2025-11-28")).unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
    assert_eq!(db.get_tally("acct-1", date).unwrap().unwrap().total_emails(), 3);
}

// ========== Account Command Tests ==========

#[test]
fn test_cmd_accounts() {
    let db = setup_test_db();

    commands::cmd_accounts_add(&db, "acct-2", Some("b@example.com"), None).unwrap();
    assert_eq!(db.list_accounts().unwrap().len(), 2);
    assert!(commands::cmd_accounts_list(&db).is_ok());

    commands::cmd_accounts_delete(&db, "acct-2").unwrap();
    assert!(db.get_account("acct-2").unwrap().is_none());
    assert!(commands::cmd_accounts_delete(&db, "acct-2").is_err());
}

#[test]
fn test_cmd_accounts_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_accounts_list(&db).is_ok());
}

// ========== Blocked Category Command Tests ==========

#[test]
fn test_cmd_block_unblock() {
    let db = setup_test_db();

    commands::cmd_block(&db, "acct-1", "Marketing").unwrap();
    assert!(db.get_blocked_categories("acct-1").unwrap().contains("Marketing"));

    commands::cmd_unblock(&db, "acct-1", "Marketing").unwrap();
    assert!(db.get_blocked_categories("acct-1").unwrap().is_empty());
    assert!(commands::cmd_unblock(&db, "acct-1", "Marketing").is_err());

    assert!(commands::cmd_block(&db, "nobody", "Marketing").is_err());
}

// ========== Report Command Tests ==========

#[test]
fn test_cmd_reports() {
    let db = setup_test_db();
    seed_recent(&db);
    let config = RecommendationConfig::default();

    for json in [false, true] {
        assert!(commands::cmd_stats(&db, &config, "acct-1", 7, json).is_ok());
        assert!(commands::cmd_recommend(&db, &config, "acct-1", 7, json).is_ok());
        assert!(commands::cmd_explain(&db, &config, "acct-1", "Marketing", 7, json).is_ok());
    }
}

#[test]
fn test_cmd_reports_errors() {
    let db = setup_test_db();
    seed_recent(&db);
    let config = RecommendationConfig::default();

    assert!(commands::cmd_recommend(&db, &config, "acct-1", 45, false).is_err());
    assert!(commands::cmd_stats(&db, &config, "nobody", 7, false).is_err());
    // Excluded by default
    assert!(commands::cmd_explain(&db, &config, "acct-1", "Personal", 7, false).is_err());
}

// ========== Retention Command Tests ==========

#[test]
fn test_cmd_prune() {
    let db = setup_test_db();
    seed_recent(&db);
    let old = Utc::now().date_naive() - Duration::days(90);
    db.save_daily_tally(&DailyTally::from_counts("acct-1", old, [("Marketing", 5)]))
        .unwrap();
    let config = RecommendationConfig::default();

    commands::cmd_prune(&db, &config, true).unwrap();
    assert!(db.get_tally("acct-1", old).unwrap().is_some());

    commands::cmd_prune(&db, &config, false).unwrap();
    assert!(db.get_tally("acct-1", old).unwrap().is_none());
    assert_eq!(db.tally_stats().unwrap().account_days, 1);
}

// ========== Init/Status Command Tests ==========

#[test]
fn test_cmd_init_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mailtally.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let config = RecommendationConfig::default();
    assert!(commands::cmd_status(&path, true, &config).is_ok());
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mailtally.toml");
    std::fs::write(&path, "minimum_count = 3\n").unwrap();

    let config = commands::load_config(Some(&path)).unwrap();
    assert_eq!(config.minimum_count, 3);
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Marketing", 20), "Marketing");
    assert_eq!(truncate("Financial-Notification", 10), "Financi...");
    assert_eq!(truncate("Événements", 6), "Évé...");
}
