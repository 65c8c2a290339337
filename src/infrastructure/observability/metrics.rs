//! Prometheus metrics definitions for Cyclecast
//!
//! All metrics use the `cyclecast_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for the scheduler, pipeline and ledger
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Scheduler ticks by read outcome
    pub ticks_total: CounterVec,
    /// Countdown read errors by kind
    pub read_errors_total: CounterVec,
    /// Countdown source refresh requests by outcome
    pub source_refreshes_total: CounterVec,
    /// Prediction jobs by outcome
    pub prediction_jobs_total: CounterVec,
    /// Prediction job duration in seconds
    pub prediction_job_seconds: HistogramVec,
    /// Verification rows by result (hit/miss)
    pub verifications_total: CounterVec,
    /// Draws seen by ingestion, by status
    pub draws_ingested_total: CounterVec,
    /// Last validated countdown value
    pub countdown_seconds: GenericGauge<AtomicF64>,
    /// Current consecutive read error count
    pub consecutive_errors: GenericGauge<AtomicF64>,
    /// Verified hit rate per slot (0-1)
    pub slot_accuracy: GenericGaugeVec<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_total = CounterVec::new(
            Opts::new("cyclecast_ticks_total", "Scheduler ticks by read outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let read_errors_total = CounterVec::new(
            Opts::new(
                "cyclecast_read_errors_total",
                "Countdown read errors by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(read_errors_total.clone()))?;

        let source_refreshes_total = CounterVec::new(
            Opts::new(
                "cyclecast_source_refreshes_total",
                "Countdown source refresh requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(source_refreshes_total.clone()))?;

        let prediction_jobs_total = CounterVec::new(
            Opts::new(
                "cyclecast_prediction_jobs_total",
                "Prediction jobs by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(prediction_jobs_total.clone()))?;

        let prediction_job_seconds = HistogramVec::new(
            HistogramOpts::new(
                "cyclecast_prediction_job_seconds",
                "Prediction job duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(prediction_job_seconds.clone()))?;

        let verifications_total = CounterVec::new(
            Opts::new(
                "cyclecast_verifications_total",
                "Verification rows by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(verifications_total.clone()))?;

        let draws_ingested_total = CounterVec::new(
            Opts::new(
                "cyclecast_draws_ingested_total",
                "Draws seen by ingestion by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(draws_ingested_total.clone()))?;

        let countdown_seconds = Gauge::with_opts(Opts::new(
            "cyclecast_countdown_seconds",
            "Last validated countdown value",
        ))?;
        registry.register(Box::new(countdown_seconds.clone()))?;

        let consecutive_errors = Gauge::with_opts(Opts::new(
            "cyclecast_consecutive_errors",
            "Current consecutive countdown read errors",
        ))?;
        registry.register(Box::new(consecutive_errors.clone()))?;

        let slot_accuracy = GaugeVec::new(
            Opts::new("cyclecast_slot_accuracy", "Verified hit rate per slot (0-1)"),
            &["slot"],
        )?;
        registry.register(Box::new(slot_accuracy.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "cyclecast_uptime_seconds",
            "Service uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_total,
            read_errors_total,
            source_refreshes_total,
            prediction_jobs_total,
            prediction_job_seconds,
            verifications_total,
            draws_ingested_total,
            countdown_seconds,
            consecutive_errors,
            slot_accuracy,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_ticks(&self, outcome: &str) {
        self.ticks_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_read_errors(&self, kind: &str) {
        self.read_errors_total.with_label_values(&[kind]).inc();
    }

    pub fn inc_refreshes(&self, outcome: &str) {
        self.source_refreshes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a finished prediction job and record its duration
    pub fn observe_job(&self, outcome: &str, seconds: f64) {
        self.prediction_jobs_total
            .with_label_values(&[outcome])
            .inc();
        self.prediction_job_seconds
            .with_label_values(&[outcome])
            .observe(seconds);
    }

    pub fn inc_verifications(&self, correct: bool) {
        let result = if correct { "hit" } else { "miss" };
        self.verifications_total.with_label_values(&[result]).inc();
    }

    pub fn inc_ingested(&self, status: &str, count: u64) {
        self.draws_ingested_total
            .with_label_values(&[status])
            .inc_by(count as f64);
    }

    pub fn set_slot_accuracy(&self, slot: usize, rate: f64) {
        self.slot_accuracy
            .with_label_values(&[slot.to_string().as_str()])
            .set(rate);
    }
}
