//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use std::collections::HashMap;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tally(account: &str, day: &str, counts: &[(&str, u64)]) -> DailyTally {
        DailyTally::from_counts(
            account,
            date(day),
            counts.iter().map(|(c, n)| (c.to_string(), *n)),
        )
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_accounts().unwrap().is_empty());
        assert!(db.path().contains("mailtally_test_"));
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('accounts', 'daily_category_tallies', 'blocked_categories', 'audit_log')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_negative_count_rejected_by_schema() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result = conn.execute(
            "INSERT INTO daily_category_tallies (account_id, tally_date, category, count) VALUES (?, ?, ?, ?)",
            params!["a", "2025-11-28", "Marketing", -1],
        );
        assert!(result.is_err(), "CHECK (count >= 0) should reject negatives");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-11-28", &[("Marketing", 3)]))
            .unwrap();

        let reopened = Database::new_unencrypted(db.path()).unwrap();
        assert_eq!(
            reopened
                .get_tally("a", date("2025-11-28"))
                .unwrap()
                .unwrap()
                .total_emails(),
            3
        );
    }

    // ========== Tallies ==========

    #[test]
    fn test_tally_round_trip() {
        let db = Database::in_memory().unwrap();
        let original = tally(
            "acct-1",
            "2025-11-28",
            &[
                ("Marketing", 45),
                ("Advertising", 32),
                ("Personal", 12),
                ("Work-related", 8),
                ("Financial-Notification", 3),
            ],
        );

        db.save_daily_tally(&original).unwrap();
        let loaded = db.get_tally("acct-1", date("2025-11-28")).unwrap().unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.total_emails(), 100);
    }

    #[test]
    fn test_get_missing_tally() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_tally("nobody", date("2025-01-01")).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_tally() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-11-28", &[("Marketing", 20), ("Personal", 5)]))
            .unwrap();
        db.save_daily_tally(&tally("a", "2025-11-28", &[("Marketing", 7)]))
            .unwrap();

        let loaded = db.get_tally("a", date("2025-11-28")).unwrap().unwrap();
        assert_eq!(loaded.category_counts().len(), 1);
        assert_eq!(loaded.count("Personal"), 0);
        assert_eq!(loaded.total_emails(), 7);
    }

    #[test]
    fn test_total_always_matches_sum_after_save() {
        let db = Database::in_memory().unwrap();
        let days = ["2025-11-01", "2025-11-02", "2025-11-03"];
        for (i, day) in days.iter().enumerate() {
            let n = i as u64 + 1;
            db.save_daily_tally(&tally("a", day, &[("A", n * 3), ("B", n), ("C", 0)]))
                .unwrap();
        }

        for t in db
            .get_tallies_for_period("a", date("2025-11-01"), date("2025-11-03"))
            .unwrap()
        {
            assert_eq!(t.total_emails(), t.category_counts().values().sum::<u64>());
            assert!(!t.category_counts().contains_key("C"));
        }
    }

    #[test]
    fn test_tallies_for_period_inclusive_and_ordered() {
        let db = Database::in_memory().unwrap();
        for day in ["2025-11-05", "2025-11-01", "2025-11-03", "2025-10-31", "2025-11-06"] {
            db.save_daily_tally(&tally("a", day, &[("News", 1)])).unwrap();
        }
        db.save_daily_tally(&tally("b", "2025-11-02", &[("News", 9)]))
            .unwrap();

        let period = db
            .get_tallies_for_period("a", date("2025-11-01"), date("2025-11-05"))
            .unwrap();
        let dates: Vec<NaiveDate> = period.iter().map(|t| t.tally_date).collect();
        assert_eq!(
            dates,
            vec![date("2025-11-01"), date("2025-11-03"), date("2025-11-05")]
        );
    }

    #[test]
    fn test_aggregated_tallies() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-11-01", &[("Marketing", 30), ("Social", 10)]))
            .unwrap();
        db.save_daily_tally(&tally("a", "2025-11-04", &[("Marketing", 30), ("News", 30)]))
            .unwrap();

        let agg = db
            .get_aggregated_tallies("a", date("2025-11-01"), date("2025-11-07"))
            .unwrap();

        assert_eq!(agg.total_emails, 100);
        // Only days that have rows count, not the 7-day span
        assert_eq!(agg.days_with_data, 2);

        let names: Vec<&str> = agg
            .category_summaries
            .iter()
            .map(|s| s.category.as_str())
            .collect();
        // Count descending, ties alphabetical
        assert_eq!(names, vec!["Marketing", "News", "Social"]);

        let marketing = agg.summary("Marketing").unwrap();
        assert_eq!(marketing.total_count, 60);
        assert!((marketing.percentage - 60.0).abs() < 1e-9);
        assert!((marketing.daily_average - 30.0).abs() < 1e-9);
        assert_eq!(marketing.trend, TrendDirection::Stable);

        // News absent on the first day counts as 0 there
        assert_eq!(agg.summary("News").unwrap().trend, TrendDirection::Increasing);
        assert_eq!(agg.summary("Social").unwrap().trend, TrendDirection::Decreasing);

        let pct_sum: f64 = agg.category_summaries.iter().map(|s| s.percentage).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregated_tallies_empty_window() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-10-01", &[("Marketing", 30)]))
            .unwrap();

        let agg = db
            .get_aggregated_tallies("a", date("2025-11-01"), date("2025-11-07"))
            .unwrap();
        assert_eq!(agg.total_emails, 0);
        assert_eq!(agg.days_with_data, 0);
        assert!(agg.category_summaries.is_empty());
        assert_eq!(agg.start_date, date("2025-11-01"));
    }

    #[test]
    fn test_merge_daily_counts_is_additive() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-11-28", &[("Marketing", 20), ("Personal", 5)]))
            .unwrap();

        let add: HashMap<String, u64> = [("Marketing".to_string(), 10), ("Advertising".to_string(), 15)]
            .into_iter()
            .collect();
        let merged = db.merge_daily_counts("a", date("2025-11-28"), &add).unwrap();

        assert_eq!(merged.count("Marketing"), 30);
        assert_eq!(merged.count("Personal"), 5);
        assert_eq!(merged.count("Advertising"), 15);
        assert_eq!(merged.total_emails(), 50);
        assert_eq!(db.get_tally("a", date("2025-11-28")).unwrap().unwrap(), merged);
    }

    #[test]
    fn test_merge_daily_counts_from_many_threads() {
        let db = Database::in_memory().unwrap();
        let one: HashMap<String, u64> = [("Marketing".to_string(), 1)].into_iter().collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let db = db.clone();
                let one = one.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        db.merge_daily_counts("a", date("2025-11-28"), &one).unwrap();
                    }
                });
            }
        });

        let loaded = db.get_tally("a", date("2025-11-28")).unwrap().unwrap();
        assert_eq!(loaded.count("Marketing"), 40);
    }

    #[test]
    fn test_merge_daily_counts_rejects_unstorable_totals() {
        let db = Database::in_memory().unwrap();
        let day = date("2025-11-28");
        let near_max: HashMap<String, u64> =
            [("Spam".to_string(), MAX_DAILY_COUNT - 1)].into_iter().collect();
        db.merge_daily_counts("a", day, &near_max).unwrap();

        let two: HashMap<String, u64> = [("Marketing".to_string(), 2)].into_iter().collect();
        let err = db.merge_daily_counts("a", day, &two).unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));

        // Nothing from the rejected merge was written
        let loaded = db.get_tally("a", day).unwrap().unwrap();
        assert_eq!(loaded.count("Marketing"), 0);
        assert_eq!(loaded.total_emails(), MAX_DAILY_COUNT - 1);

        let one: HashMap<String, u64> = [("Marketing".to_string(), 1)].into_iter().collect();
        let merged = db.merge_daily_counts("a", day, &one).unwrap();
        assert_eq!(merged.total_emails(), MAX_DAILY_COUNT);

        let huge: HashMap<String, u64> = [("Spam".to_string(), u64::MAX)].into_iter().collect();
        assert!(db.merge_daily_counts("b", day, &huge).is_err());
        assert!(db.get_tally("b", day).unwrap().is_none());
    }

    #[test]
    fn test_save_daily_tally_rejects_unstorable_totals() {
        let db = Database::in_memory().unwrap();
        let too_big = DailyTally::from_counts(
            "a",
            date("2025-11-28"),
            [("A", MAX_DAILY_COUNT), ("B", 1)],
        );
        assert!(matches!(
            db.save_daily_tally(&too_big),
            Err(crate::Error::Validation(_))
        ));
        assert!(db.get_tally("a", date("2025-11-28")).unwrap().is_none());
    }

    #[test]
    fn test_delete_tallies_before() {
        let db = Database::in_memory().unwrap();
        db.save_daily_tally(&tally("a", "2025-10-01", &[("A", 1), ("B", 2)]))
            .unwrap();
        db.save_daily_tally(&tally("b", "2025-10-15", &[("A", 1)]))
            .unwrap();
        db.save_daily_tally(&tally("a", "2025-10-29", &[("A", 1)]))
            .unwrap();

        let deleted = db.delete_tallies_before(date("2025-10-29")).unwrap();
        // Account-days, not category rows
        assert_eq!(deleted, 2);

        assert!(db.get_tally("a", date("2025-10-01")).unwrap().is_none());
        assert!(db.get_tally("a", date("2025-10-29")).unwrap().is_some());
        assert_eq!(db.delete_tallies_before(date("2025-10-29")).unwrap(), 0);
    }

    #[test]
    fn test_tally_stats() {
        let db = Database::in_memory().unwrap();
        let empty = db.tally_stats().unwrap();
        assert_eq!(empty.account_days, 0);
        assert!(empty.oldest_date.is_none());

        db.save_daily_tally(&tally("a", "2025-11-01", &[("A", 1), ("B", 1)]))
            .unwrap();
        db.save_daily_tally(&tally("b", "2025-11-03", &[("A", 1)]))
            .unwrap();

        let stats = db.tally_stats().unwrap();
        assert_eq!(stats.accounts, 2);
        assert_eq!(stats.account_days, 2);
        assert_eq!(stats.oldest_date, Some(date("2025-11-01")));
        assert_eq!(stats.newest_date, Some(date("2025-11-03")));
    }

    // ========== Accounts ==========

    #[test]
    fn test_account_crud() {
        let db = Database::in_memory().unwrap();

        let created = db
            .create_account("acct-1", Some("me@example.com"), Some("Personal inbox"))
            .unwrap();
        assert_eq!(created.id, "acct-1");
        assert_eq!(created.email.as_deref(), Some("me@example.com"));

        // Creating again keeps the original
        let again = db.create_account("acct-1", None, None).unwrap();
        assert_eq!(again.display_name.as_deref(), Some("Personal inbox"));

        db.create_account("acct-0", None, None).unwrap();
        let ids: Vec<String> = db.list_accounts().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["acct-0", "acct-1"]);

        assert!(db.get_account("missing").unwrap().is_none());
        assert!(matches!(
            db.require_account("missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_create_account_rejects_blank_id() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.create_account("   ", None, None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_delete_account_cascades() {
        let db = Database::in_memory().unwrap();
        db.create_account("a", None, None).unwrap();
        db.save_daily_tally(&tally("a", "2025-11-01", &[("A", 1)]))
            .unwrap();
        db.block_category("a", "Marketing").unwrap();

        assert!(db.delete_account("a").unwrap());
        assert!(db.get_tally("a", date("2025-11-01")).unwrap().is_none());
        assert!(db.get_blocked_categories("a").unwrap().is_empty());
        assert!(!db.delete_account("a").unwrap());
    }

    // ========== Blocked categories ==========

    #[test]
    fn test_block_and_unblock() {
        let db = Database::in_memory().unwrap();

        db.block_category("a", "Marketing").unwrap();
        db.block_category("a", " Marketing ").unwrap();
        db.block_category("a", "Advertising").unwrap();
        db.block_category("b", "Social").unwrap();

        let blocked = db.get_blocked_categories("a").unwrap();
        assert_eq!(blocked.len(), 2);
        assert!(blocked.contains("Marketing"));

        let listed = db.list_blocked_categories("a").unwrap();
        assert_eq!(listed[0].category, "Advertising");

        assert!(db.unblock_category("a", "Marketing").unwrap());
        assert!(!db.unblock_category("a", "Marketing").unwrap());
        assert_eq!(db.get_blocked_categories("a").unwrap().len(), 1);

        assert!(matches!(
            db.block_category("a", ""),
            Err(Error::Validation(_))
        ));
    }

    // ========== Audit ==========

    #[test]
    fn test_audit_log() {
        let db = Database::in_memory().unwrap();
        db.log_audit("api", "recommendations", Some("account"), Some("a"), Some("days=7"))
            .unwrap();
        db.log_audit("cli", "prune", None, None, None).unwrap();

        let entries = db.list_audit_log(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "prune");
        assert_eq!(entries[1].entity_id.as_deref(), Some("a"));

        assert_eq!(db.list_audit_log(1).unwrap().len(), 1);
    }

    #[test]
    fn test_account_audit_log() {
        let db = Database::in_memory().unwrap();
        db.log_audit("api", "record", Some("category_counts"), Some("a"), None)
            .unwrap();
        db.log_audit("api", "record", Some("category_counts"), Some("b"), None)
            .unwrap();
        db.log_audit("api", "block", Some("blocked_category"), Some("a"), None)
            .unwrap();
        db.log_audit("cli", "prune", None, None, None).unwrap();

        let entries = db.list_account_audit_log("a", 10).unwrap();
        let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["block", "record"]);
        assert_eq!(db.list_account_audit_log("a", 1).unwrap().len(), 1);
        assert!(db.list_account_audit_log("c", 10).unwrap().is_empty());
    }
}
