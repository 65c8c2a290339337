use crate::domain::draw::DrawRecord;
use crate::domain::repositories::DrawRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteDrawRepository {
    pool: SqlitePool,
}

impl SqliteDrawRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type DrawRow = (String, String, DateTime<Utc>);

fn from_row((draw_id, numbers, draw_time): DrawRow) -> Result<DrawRecord> {
    let numbers: Vec<String> = serde_json::from_str(&numbers)
        .with_context(|| format!("Corrupt numbers column for draw {}", draw_id))?;
    Ok(DrawRecord::new(draw_id, numbers, draw_time))
}

#[async_trait]
impl DrawRepository for SqliteDrawRepository {
    async fn append(&self, draw: &DrawRecord) -> Result<bool> {
        let numbers = serde_json::to_string(&draw.numbers)?;

        let result = sqlx::query(
            r#"
            INSERT INTO draws (draw_id, numbers, draw_time, ingested_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(draw_id) DO NOTHING
            "#,
        )
        .bind(draw.draw_id.trim())
        .bind(numbers)
        .bind(draw.draw_time)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to append draw")?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<DrawRecord>> {
        let rows = sqlx::query_as::<_, DrawRow>(
            r#"
            SELECT draw_id, numbers, draw_time
            FROM draws
            ORDER BY draw_time DESC, draw_id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent draws")?;

        rows.into_iter().map(from_row).collect()
    }

    async fn find_by_id(&self, draw_id: &str) -> Result<Option<DrawRecord>> {
        let row = sqlx::query_as::<_, DrawRow>(
            "SELECT draw_id, numbers, draw_time FROM draws WHERE draw_id = ?",
        )
        .bind(draw_id.trim())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch draw")?;

        row.map(from_row).transpose()
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM draws")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count draws")?;
        Ok(count as usize)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM draws WHERE draw_time < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to purge old draws")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::database::Database;
    use chrono::{Duration, TimeZone};

    fn draw(id: &str, digits: &str, minutes_ago: i64) -> DrawRecord {
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        DrawRecord::new(
            id,
            digits.chars().map(|c| c.to_string()).collect(),
            base - Duration::minutes(minutes_ago),
        )
    }

    async fn repository() -> SqliteDrawRepository {
        let db = Database::new("sqlite::memory:").await.unwrap();
        SqliteDrawRepository::new(db.pool)
    }

    #[tokio::test]
    async fn test_append_deduplicates_by_id() {
        let repo = repository().await;

        assert!(repo.append(&draw("1001", "12345", 3)).await.unwrap());
        assert!(!repo.append(&draw("1001", "99999", 3)).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);

        let stored = repo.find_by_id("1001").await.unwrap().unwrap();
        assert_eq!(stored.numbers, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_find_recent_is_newest_first() {
        let repo = repository().await;
        for (i, id) in ["1001", "1002", "1003", "1004"].iter().enumerate() {
            repo.append(&draw(id, "12345", 30 - 3 * i as i64)).await.unwrap();
        }

        let recent = repo.find_recent(3).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|d| d.draw_id.as_str()).collect();
        assert_eq!(ids, vec!["1004", "1003", "1002"]);
        assert_eq!(recent[0].draw_time, draw("1004", "12345", 21).draw_time);
    }

    #[tokio::test]
    async fn test_purge_before_cutoff() {
        let repo = repository().await;
        repo.append(&draw("1", "00000", 60 * 24 * 10)).await.unwrap();
        repo.append(&draw("2", "00000", 60)).await.unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        assert_eq!(repo.purge_before(cutoff).await.unwrap(), 1);
        assert!(repo.find_by_id("1").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
