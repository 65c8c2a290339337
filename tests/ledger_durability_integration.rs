use chrono::{TimeZone, Utc};
use cyclecast::application::ledger::VerificationLedger;
use cyclecast::domain::draw::{Category, DrawRecord};
use cyclecast::domain::prediction::PredictionBatch;
use cyclecast::infrastructure::FileAuditLog;
use cyclecast::infrastructure::audit_log::AUDIT_LOG_HEADER;
use cyclecast::infrastructure::persistence::Database;
use cyclecast::infrastructure::persistence::repositories::SqlitePredictionRepository;
use std::path::Path;
use std::sync::Arc;

async fn open_ledger(db_path: &Path, audit_path: &Path) -> (Database, VerificationLedger) {
    let url = format!("sqlite://{}", db_path.display());
    let db = Database::new(&url).await.unwrap();
    let ledger = VerificationLedger::new(
        Arc::new(SqlitePredictionRepository::new(db.pool.clone())),
        Arc::new(FileAuditLog::new(audit_path)),
        5,
    );
    (db, ledger)
}

fn all_high_batch() -> PredictionBatch {
    PredictionBatch {
        categories: vec![Category::High; 5],
        display_numbers: vec![7, 5, 9, 6, 8],
        probabilities: vec![0.62, 0.57, 0.6, 0.55, 0.71],
        trends: vec![0.6; 5],
    }
}

fn draw(id: &str, digits: &str) -> DrawRecord {
    DrawRecord::new(
        id,
        digits.chars().map(|c| c.to_string()).collect(),
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_pending_survives_restart_and_resolves_once() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");
    let audit_path = dir.path().join("history.txt");

    // First process: issue a prediction, then stop
    {
        let (db, ledger) = open_ledger(&db_path, &audit_path).await;
        ledger
            .record_prediction("20461", &all_high_batch())
            .await
            .unwrap();
        db.pool.close().await;
    }

    // Second process: the prediction is still pending and gets verified
    let (db, ledger) = open_ledger(&db_path, &audit_path).await;
    let pending = ledger.pending().await.unwrap().expect("pending lost on restart");
    assert_eq!(pending.cycle_id, "20461");

    let unrelated = ledger.resolve(&[draw("20460", "00000")]).await.unwrap();
    assert!(unrelated.is_empty());
    assert!(ledger.pending().await.unwrap().is_some());

    let verified = ledger.resolve(&[draw("20461", "91827")]).await.unwrap();
    assert_eq!(verified.len(), 5);
    let hits: Vec<bool> = verified.iter().map(|r| r.correct).collect();
    assert_eq!(hits, vec![true, false, true, false, true]);
    assert!(ledger.pending().await.unwrap().is_none());

    // Resolving again appends nothing
    assert!(ledger.resolve(&[draw("20461", "91827")]).await.unwrap().is_empty());
    db.pool.close().await;

    // Third process: rows are durable
    let (_db, ledger) = open_ledger(&db_path, &audit_path).await;
    let summary = ledger.accuracy_summary().await.unwrap();
    assert_eq!(summary.total(), 5);
    assert_eq!(summary.hits(), 3);

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert!(audit.starts_with(AUDIT_LOG_HEADER));
    assert_eq!(audit.lines().filter(|l| l.contains("20461")).count(), 5);
    assert_eq!(audit.lines().filter(|l| l.contains("[HIT]")).count(), 3);
}

#[tokio::test]
async fn test_malformed_target_keeps_pending() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, ledger) =
        open_ledger(&dir.path().join("ledger.db"), &dir.path().join("history.txt")).await;

    ledger
        .record_prediction("20462", &all_high_batch())
        .await
        .unwrap();

    assert!(ledger.resolve(&[draw("20462", "12x45")]).await.is_err());
    assert!(ledger.pending().await.unwrap().is_some());
    assert_eq!(ledger.accuracy_summary().await.unwrap().total(), 0);
}
