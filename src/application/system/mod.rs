use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod shutdown_service;

use crate::application::ledger::VerificationLedger;
use crate::application::ml::{ConstantScorer, Scorer, SmartCoreScorer};
use crate::application::scheduler::{CountdownScheduler, IngestionService, PredictionService};
use crate::application::scoring::ScoringPipeline;
use crate::application::system::shutdown_service::ShutdownService;
use crate::config::{Config, Mode};
use crate::domain::ports::{CountdownSource, DrawFeed};
use crate::domain::repositories::{DrawRepository, PredictionRepository};
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use crate::infrastructure::persistence::Database;
use crate::infrastructure::persistence::repositories::{
    SqliteDrawRepository, SqlitePredictionRepository,
};
use crate::infrastructure::{
    FileAuditLog, HttpCountdownSource, HttpDrawFeed, SimulatedClock, SimulatedCountdownSource,
    SimulatedDrawFeed,
};

/// Running background tasks plus the means to stop them
pub struct SystemHandle {
    pub ledger: Arc<VerificationLedger>,
    pub metrics: Metrics,
    shutdown: ShutdownService,
}

impl SystemHandle {
    /// Signal every task, wait for them, close the store
    pub async fn shutdown(self) {
        self.shutdown.shutdown().await;
    }
}

/// Fully wired scheduler, ready to start
pub struct Application {
    pub config: Config,
    pub database: Database,
    pub draws: Arc<dyn DrawRepository>,
    pub ledger: Arc<VerificationLedger>,
    pub countdown_source: Arc<dyn CountdownSource>,
    pub draw_feed: Arc<dyn DrawFeed>,
    pub prediction_service: Arc<PredictionService>,
    pub metrics: Metrics,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!("Building Cyclecast application (Mode: {:?})...", config.mode);

        let metrics = Metrics::new()?;
        let database = Database::new(&config.database_url).await?;

        let draws: Arc<dyn DrawRepository> =
            Arc::new(SqliteDrawRepository::new(database.pool.clone()));
        let predictions: Arc<dyn PredictionRepository> =
            Arc::new(SqlitePredictionRepository::new(database.pool.clone()));
        let audit_log = Arc::new(FileAuditLog::new(config.audit_log_path.clone()));

        let slot_count = config.scoring_config.slot_count;
        let ledger = Arc::new(VerificationLedger::new(predictions, audit_log, slot_count));

        let pipeline = ScoringPipeline::new(build_scorers(&config), config.scoring_config.clone());
        info!("Scoring ensemble: {:?}", pipeline.scorer_names());

        let prediction_service = Arc::new(PredictionService::new(
            draws.clone(),
            pipeline,
            ledger.clone(),
            metrics.clone(),
            config.scoring.history_fetch_limit,
        ));

        let (countdown_source, draw_feed) = build_sources(&config)?;

        if let Some(pending) = ledger.pending().await? {
            info!(
                "Resuming with pending prediction for cycle {} ({} slots)",
                pending.cycle_id,
                pending.slot_count()
            );
        }

        Ok(Self {
            config,
            database,
            draws,
            ledger,
            countdown_source,
            draw_feed,
            prediction_service,
            metrics,
        })
    }

    pub async fn start(self) -> Result<SystemHandle> {
        info!("Starting background tasks...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        let ingestion = IngestionService::new(
            self.draw_feed.clone(),
            self.draws.clone(),
            self.metrics.clone(),
            self.config.scoring_config.slot_count,
            Duration::from_secs(self.config.source.ingest_interval_secs),
            Duration::from_millis(self.config.source.ingest_timeout_ms),
        )
        .with_retention_days(self.config.source.retention_days);

        // Fill the store before the first firing window comes around
        match ingestion.ingest_once().await {
            Ok(report) => info!(
                "Initial ingestion: {} fetched, {} stored",
                report.fetched, report.stored
            ),
            Err(e) => warn!("Initial ingestion failed: {:#}", e),
        }
        tasks.push(("IngestionService", tokio::spawn(ingestion.run(shutdown_rx.clone()))));

        let scheduler = CountdownScheduler::new(
            self.countdown_source.clone(),
            self.prediction_service.clone(),
            self.config.cycle.clone(),
            self.metrics.clone(),
        );
        tasks.push(("CountdownScheduler", tokio::spawn(scheduler.run(shutdown_rx.clone()))));

        if self.config.observability.enabled {
            let reporter = MetricsReporter::new(
                self.ledger.clone(),
                self.metrics.clone(),
                self.config.observability.interval_secs,
            );
            tasks.push(("MetricsReporter", tokio::spawn(reporter.run(shutdown_rx.clone()))));
        }

        let shutdown = ShutdownService::new(
            shutdown_tx,
            tasks,
            self.database.clone(),
            self.config.cycle.shutdown_grace,
        );

        info!("Cyclecast running");
        Ok(SystemHandle {
            ledger: self.ledger,
            metrics: self.metrics,
            shutdown,
        })
    }
}

/// One forest per configured model file; the neutral scorer when none are set
fn build_scorers(config: &Config) -> Vec<Arc<dyn Scorer>> {
    let mut scorers: Vec<Arc<dyn Scorer>> = Vec::new();
    for path in &config.scoring.scorer_model_paths {
        let scorer = SmartCoreScorer::new(path.clone());
        if !scorer.is_loaded() {
            warn!("Model {:?} unavailable, scorer will answer neutral", path);
        }
        scorers.push(Arc::new(scorer));
    }

    if scorers.is_empty() {
        info!("No scorer models configured, using the neutral scorer");
        scorers.push(Arc::new(ConstantScorer::neutral()));
    }
    scorers
}

fn build_sources(config: &Config) -> Result<(Arc<dyn CountdownSource>, Arc<dyn DrawFeed>)> {
    let fetch_limit = config.scoring.history_fetch_limit;
    match config.mode {
        Mode::Mock => {
            let clock = SimulatedClock::new(config.source.simulated_cycle_secs as i64);
            info!("Simulated cycle of {}s", clock.cycle_secs());
            Ok((
                Arc::new(SimulatedCountdownSource::new(clock)),
                Arc::new(SimulatedDrawFeed::new(
                    clock,
                    config.scoring_config.slot_count,
                    fetch_limit,
                )),
            ))
        }
        Mode::Http => {
            let countdown_url = config
                .source
                .countdown_url
                .clone()
                .context("COUNTDOWN_URL is required when MODE=http")?;
            let draws_url = config
                .source
                .draws_url
                .as_deref()
                .context("DRAWS_URL is required when MODE=http")?;
            let timeout = Duration::from_millis(config.source.ingest_timeout_ms);

            Ok((
                Arc::new(HttpCountdownSource::new(
                    countdown_url,
                    config.source.refresh_url.clone(),
                    config.cycle.read_timeout,
                )),
                Arc::new(HttpDrawFeed::new(draws_url, fetch_limit, timeout)?),
            ))
        }
    }
}
