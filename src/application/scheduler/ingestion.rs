use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

use crate::domain::draw::sort_newest_first;
use crate::domain::ports::DrawFeed;
use crate::domain::repositories::DrawRepository;
use crate::infrastructure::observability::Metrics;

/// Counts from one ingestion pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Copies completed draws from the feed into the draw store.
///
/// The store is append-only from the scheduler's point of view; this service
/// is its only writer.
pub struct IngestionService {
    feed: Arc<dyn DrawFeed>,
    draws: Arc<dyn DrawRepository>,
    metrics: Metrics,
    slot_count: usize,
    interval: Duration,
    fetch_timeout: Duration,
    retention_days: u32,
    last_purge: Option<DateTime<Utc>>,
}

impl IngestionService {
    pub fn new(
        feed: Arc<dyn DrawFeed>,
        draws: Arc<dyn DrawRepository>,
        metrics: Metrics,
        slot_count: usize,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            feed,
            draws,
            metrics,
            slot_count,
            interval,
            fetch_timeout,
            retention_days: 0,
            last_purge: None,
        }
    }

    /// Delete draws older than `days`; 0 keeps everything
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub async fn ingest_once(&self) -> anyhow::Result<IngestReport> {
        let mut records = timeout(self.fetch_timeout, self.feed.fetch_latest_records())
            .await
            .map_err(|_| anyhow::anyhow!("Draw feed timed out after {:?}", self.fetch_timeout))??;

        // Oldest first so insertion order follows the draws
        sort_newest_first(&mut records);
        records.reverse();

        let mut report = IngestReport {
            fetched: records.len(),
            ..Default::default()
        };

        for record in &records {
            if !record.is_well_formed(self.slot_count) {
                warn!(
                    "Ignoring malformed draw {:?} ({} numbers)",
                    record.draw_id,
                    record.numbers.len()
                );
                report.malformed += 1;
                continue;
            }

            if self.draws.append(record).await? {
                debug!("Stored draw {}", record.draw_id);
                report.stored += 1;
            } else {
                report.duplicates += 1;
            }
        }

        self.metrics.inc_ingested("stored", report.stored as u64);
        self.metrics.inc_ingested("duplicate", report.duplicates as u64);
        self.metrics.inc_ingested("malformed", report.malformed as u64);

        if report.stored > 0 {
            info!(
                "Ingested {} new draw(s) ({} already known)",
                report.stored, report.duplicates
            );
        }

        Ok(report)
    }

    /// Runs the retention purge at most once a day
    pub async fn purge_if_due(&mut self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        if self.retention_days == 0 {
            return Ok(0);
        }
        if let Some(last) = self.last_purge
            && now - last < ChronoDuration::days(1)
        {
            return Ok(0);
        }

        let cutoff = now - ChronoDuration::days(self.retention_days as i64);
        let removed = self.draws.purge_before(cutoff).await?;
        self.last_purge = Some(now);

        if removed > 0 {
            info!(
                "Retention: removed {} draw(s) older than {}",
                removed,
                cutoff.format("%Y-%m-%d")
            );
        }
        Ok(removed)
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("IngestionService: polling the draw feed every {:?}", self.interval);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.ingest_once().await {
                        error!("Draw ingestion failed: {:#}", e);
                    }
                    if let Err(e) = self.purge_if_due(Utc::now()).await {
                        error!("Draw retention purge failed: {:#}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("IngestionService: stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::draw::DrawRecord;
    use crate::infrastructure::mock::InMemoryDrawFeed;
    use crate::infrastructure::persistence::Database;
    use crate::infrastructure::persistence::repositories::SqliteDrawRepository;
    use chrono::TimeZone;

    fn draw(id: &str, digits: &str, minute: u32) -> DrawRecord {
        DrawRecord::new(
            id,
            digits.chars().map(|c| c.to_string()).collect(),
            Utc.with_ymd_and_hms(2026, 10, 19, 12, minute, 0).unwrap(),
        )
    }

    async fn setup(records: Vec<DrawRecord>) -> (Arc<InMemoryDrawFeed>, Arc<SqliteDrawRepository>, IngestionService) {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let draws = Arc::new(SqliteDrawRepository::new(db.pool.clone()));
        let feed = Arc::new(InMemoryDrawFeed::new(records));
        let service = IngestionService::new(
            feed.clone(),
            draws.clone(),
            Metrics::new().unwrap(),
            5,
            Duration::from_secs(5),
            Duration::from_secs(1),
        );
        (feed, draws, service)
    }

    #[tokio::test]
    async fn test_ingest_skips_duplicates() {
        let (feed, draws, service) =
            setup(vec![draw("00002", "12345", 2), draw("00001", "67890", 1)]).await;

        let first = service.ingest_once().await.unwrap();
        assert_eq!(first.stored, 2);

        feed.push(draw("00003", "55555", 3));
        let second = service.ingest_once().await.unwrap();
        assert_eq!(
            second,
            IngestReport {
                fetched: 3,
                stored: 1,
                duplicates: 2,
                malformed: 0,
            }
        );
        assert_eq!(draws.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ingest_rejects_malformed() {
        let (_feed, draws, service) =
            setup(vec![draw("00001", "12a45", 1), draw("00002", "123", 2)]).await;

        let report = service.ingest_once().await.unwrap();
        assert_eq!(report.malformed, 2);
        assert_eq!(draws.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_rejects_non_decimal_ids() {
        let (_feed, draws, service) = setup(vec![
            draw("00001", "12345", 1),
            draw("A0002", "12345", 2),
            draw(" ", "12345", 3),
        ])
        .await;

        let report = service.ingest_once().await.unwrap();
        assert_eq!(
            report,
            IngestReport {
                fetched: 3,
                stored: 1,
                duplicates: 0,
                malformed: 2,
            }
        );
        assert!(draws.find_by_id("A0002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_runs_once_a_day() {
        let old = DrawRecord::new(
            "00001",
            vec!["1".into(), "2".into(), "3".into(), "4".into(), "5".into()],
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        );
        let (_feed, draws, service) = setup(vec![old, draw("00002", "12345", 2)]).await;
        let mut service = service.with_retention_days(30);
        service.ingest_once().await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
        assert_eq!(service.purge_if_due(now).await.unwrap(), 1);
        assert_eq!(draws.count().await.unwrap(), 1);

        // Second call the same day is skipped
        assert_eq!(
            service.purge_if_due(now + ChronoDuration::hours(1)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_purge_disabled_by_default() {
        let (_feed, _draws, mut service) = setup(vec![]).await;
        assert_eq!(service.purge_if_due(Utc::now()).await.unwrap(), 0);
    }
}
