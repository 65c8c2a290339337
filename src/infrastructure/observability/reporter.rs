//! Push-based metrics reporter for Cyclecast
//!
//! Periodically outputs metrics as structured JSON to stdout.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::application::ledger::VerificationLedger;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub scheduler: SchedulerSnapshot,
    pub accuracy: AccuracySnapshot,
}

#[derive(Serialize)]
pub struct SchedulerSnapshot {
    pub countdown_seconds: f64,
    pub consecutive_errors: f64,
}

#[derive(Serialize)]
pub struct AccuracySnapshot {
    pub hits: u64,
    pub total: u64,
    pub hit_rate: Option<f64>,
    pub slots: Vec<SlotSnapshot>,
}

#[derive(Serialize)]
pub struct SlotSnapshot {
    pub slot: usize,
    pub hits: u64,
    pub total: u64,
    pub hit_rate: Option<f64>,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
/// No HTTP server, no incoming connections - only outbound data.
pub struct MetricsReporter {
    ledger: Arc<VerificationLedger>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(ledger: Arc<VerificationLedger>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            ledger,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Output a snapshot every interval until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("MetricsReporter: Shutdown signal received");
                    break;
                }
            }

            match self.collect_snapshot().await {
                Ok(snapshot) => match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        // Prefix lets log shippers filter metric lines
                        println!("METRICS_JSON:{}", json);
                        info!(
                            "Accuracy: {}/{} | Countdown: {}s | Uptime: {}s",
                            snapshot.accuracy.hits,
                            snapshot.accuracy.total,
                            snapshot.scheduler.countdown_seconds,
                            snapshot.uptime_seconds
                        );
                    }
                    Err(e) => warn!("Failed to serialize metrics: {}", e),
                },
                Err(e) => warn!("Failed to collect metrics: {}", e),
            }
        }
    }

    async fn collect_snapshot(&self) -> anyhow::Result<MetricsSnapshot> {
        let uptime = self.start_time.elapsed().as_secs();
        let summary = self.ledger.accuracy_summary().await?;

        let slots: Vec<SlotSnapshot> = summary
            .slots
            .iter()
            .map(|s| {
                if let Some(rate) = s.hit_rate() {
                    self.metrics.set_slot_accuracy(s.slot, rate);
                }
                SlotSnapshot {
                    slot: s.slot,
                    hits: s.hits,
                    total: s.total,
                    hit_rate: s.hit_rate(),
                }
            })
            .collect();

        self.metrics.uptime_seconds.set(uptime as f64);

        Ok(MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            scheduler: SchedulerSnapshot {
                countdown_seconds: self.metrics.countdown_seconds.get(),
                consecutive_errors: self.metrics.consecutive_errors.get(),
            },
            accuracy: AccuracySnapshot {
                hits: summary.hits(),
                total: summary.total(),
                hit_rate: summary.hit_rate(),
                slots,
            },
        })
    }
}
