use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared SQLite pool holding the draw store and the verification ledger
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let in_memory = db_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("Invalid database URL: {}", db_url))?
            .create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Readers never block the ingestion writer
        }

        // Every in-memory connection is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Draw history, written only by ingestion
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS draws (
                draw_id TEXT PRIMARY KEY,
                numbers TEXT NOT NULL,
                draw_time TEXT NOT NULL,
                ingested_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create draws table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_draws_time
            ON draws (draw_time DESC);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create draws index")?;

        // 2. Pending prediction (single row)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_prediction (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                prediction_id TEXT NOT NULL,
                cycle_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                predicted_categories TEXT NOT NULL,
                display_numbers TEXT NOT NULL,
                probabilities TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create pending_prediction table")?;

        // 3. Verification ledger (append-only)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prediction_id TEXT NOT NULL,
                cycle_id TEXT NOT NULL,
                slot INTEGER NOT NULL,
                predicted TEXT NOT NULL,
                predicted_digit INTEGER NOT NULL,
                probability REAL NOT NULL,
                actual TEXT NOT NULL,
                actual_digit INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                predicted_at TEXT NOT NULL,
                verified_at TEXT NOT NULL,
                UNIQUE (cycle_id, slot)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create verifications table")?;

        info!("Database schema initialized");

        Ok(())
    }
}
