//! Ledger report - prints verification accuracy from the ledger database
//!
//! Read-only: the pending prediction and the verification rows are never modified.
//!
//! # Usage
//! ```sh
//! cargo run --bin ledger_report -- --database-url sqlite://data/cyclecast.db --recent 20
//! ```

use anyhow::Result;
use clap::Parser;
use cyclecast::application::ledger::{VerificationLedger, format_audit_line};
use cyclecast::config::DEFAULT_DATABASE_URL;
use cyclecast::infrastructure::mock::MemoryAuditLog;
use cyclecast::infrastructure::persistence::Database;
use cyclecast::infrastructure::persistence::repositories::SqlitePredictionRepository;
use serde_json::json;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite URL of the ledger
    #[arg(long, default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Number of most recent verification rows to print
    #[arg(long, default_value_t = 10)]
    recent: usize,

    /// Number of digit slots per draw
    #[arg(long, default_value_t = 5)]
    slots: usize,

    /// Print a single JSON document instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let db = Database::new(&args.database_url).await?;
    let repository = Arc::new(SqlitePredictionRepository::new(db.pool.clone()));
    let ledger = VerificationLedger::new(
        repository,
        Arc::new(MemoryAuditLog::default()),
        args.slots,
    );

    let summary = ledger.accuracy_summary().await?;
    let recent = ledger.recent_verifications(args.recent).await?;
    let pending = ledger.pending().await?;

    if args.json {
        let report = json!({
            "summary": summary,
            "hit_rate": summary.hit_rate(),
            "pending_cycle": pending.as_ref().map(|p| p.cycle_id.clone()),
            "recent": recent,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== LEDGER REPORT ({}) ===", args.database_url);
    match summary.hit_rate() {
        Some(rate) => println!(
            "Overall: {}/{} ({:.1}%)",
            summary.hits(),
            summary.total(),
            rate * 100.0
        ),
        None => println!("Overall: no verified predictions yet"),
    }
    for slot in &summary.slots {
        let rate = slot
            .hit_rate()
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!("  slot {}: {}/{} ({})", slot.slot, slot.hits, slot.total, rate);
    }

    match &pending {
        Some(p) => println!("Pending: cycle {} ({} slots)", p.cycle_id, p.slot_count()),
        None => println!("Pending: none"),
    }

    if !recent.is_empty() {
        println!();
        println!("Most recent {} verification(s):", recent.len());
        for record in &recent {
            println!("{}", format_audit_line(record));
        }
    }

    db.pool.close().await;
    Ok(())
}
