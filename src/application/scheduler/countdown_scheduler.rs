use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

use super::prediction_job::PredictionJob;
use crate::domain::config::CycleConfig;
use crate::domain::cycle::{CycleState, TickDecision};
use crate::domain::errors::ReadError;
use crate::domain::ports::CountdownSource;
use crate::infrastructure::observability::Metrics;

/// Single poller driving the countdown state machine.
///
/// Each tick reads the countdown (bounded by the read timeout), advances the
/// `CycleState` value and acts on the decision. The prediction job and source
/// refreshes run in spawned tasks, so a tick never waits on them.
pub struct CountdownScheduler {
    source: Arc<dyn CountdownSource>,
    job: Arc<dyn PredictionJob>,
    config: CycleConfig,
    metrics: Metrics,
    state: CycleState,
    job_handle: Option<JoinHandle<()>>,
    refresh_handle: Option<JoinHandle<()>>,
}

impl CountdownScheduler {
    pub fn new(
        source: Arc<dyn CountdownSource>,
        job: Arc<dyn PredictionJob>,
        config: CycleConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            source,
            job,
            config,
            metrics,
            state: CycleState::new(Instant::now()),
            job_handle: None,
            refresh_handle: None,
        }
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn job_in_flight(&self) -> bool {
        self.job_handle.is_some()
    }

    /// One tick: read, advance the state machine, launch whatever it asks for.
    pub async fn run_scheduler_cycle(&mut self) -> TickDecision {
        self.reap_finished_job();

        let reading = match timeout(self.config.read_timeout, self.source.read_countdown_seconds())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ReadError::Timeout {
                duration_ms: self.config.read_timeout.as_millis() as u64,
            }),
        };

        let (next, decision) = self
            .state
            .clone()
            .on_tick(reading, Instant::now(), &self.config);
        let previous_countdown = self.state.last_observed;
        self.state = next;

        self.record_tick(&decision, previous_countdown);

        if decision.request_refresh {
            self.spawn_refresh();
        }
        if decision.fire {
            self.spawn_job();
        }

        decision
    }

    /// Poll on a fixed period until `shutdown` flips to true, then drain.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "CountdownScheduler: polling every {:?}, firing window {:?}",
            self.config.poll_interval, self.config.fire_window
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.run_scheduler_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender dropped, nobody can stop us anymore
                        break;
                    }
                }
            }
        }

        self.drain().await;
    }

    /// Give an in-flight job the grace period, then abort it.
    pub async fn drain(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.abort();
        }

        let Some(mut handle) = self.job_handle.take() else {
            info!("CountdownScheduler: stopped");
            return;
        };

        info!(
            "CountdownScheduler: waiting up to {:?} for the in-flight prediction job",
            self.config.shutdown_grace
        );
        match timeout(self.config.shutdown_grace, &mut handle).await {
            Ok(_) => info!("CountdownScheduler: in-flight job finished, stopped"),
            Err(_) => {
                warn!("CountdownScheduler: grace period elapsed, aborting prediction job");
                handle.abort();
            }
        }
        self.state = self.state.clone().on_firing_complete();
    }

    fn reap_finished_job(&mut self) {
        if self
            .job_handle
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            self.job_handle = None;
            self.state = self.state.clone().on_firing_complete();
        }

        if self
            .refresh_handle
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            self.refresh_handle = None;
        }
    }

    fn record_tick(&self, decision: &TickDecision, previous: Option<u32>) {
        self.metrics
            .consecutive_errors
            .set(self.state.consecutive_errors as f64);

        match (&decision.read_error, decision.countdown) {
            (Some(err), _) => {
                self.metrics.inc_ticks("error");
                self.metrics.inc_read_errors(err.kind());
                warn!(
                    "Countdown read failed ({} consecutive): {}",
                    self.state.consecutive_errors, err
                );
            }
            (None, Some(seconds)) => {
                self.metrics.inc_ticks("ok");
                self.metrics.countdown_seconds.set(seconds as f64);
                if previous != Some(seconds) {
                    debug!("Countdown: {}s remaining", seconds);
                }
            }
            (None, None) => {}
        }

        if decision.rollover {
            info!("New cycle started (countdown reset to {:?}s)", decision.countdown);
        }
    }

    fn spawn_refresh(&mut self) {
        if self.refresh_handle.is_some() {
            debug!("Source refresh already running, skipping");
            return;
        }

        warn!(
            "{} consecutive read errors, requesting source refresh",
            self.config.error_threshold
        );
        let source = self.source.clone();
        let metrics = self.metrics.clone();
        self.refresh_handle = Some(tokio::spawn(async move {
            match source.request_refresh().await {
                Ok(()) => {
                    metrics.inc_refreshes("ok");
                    info!("Countdown source refresh completed");
                }
                Err(e) => {
                    metrics.inc_refreshes("failed");
                    error!("Countdown source refresh failed: {:#}", e);
                }
            }
        }));
    }

    fn spawn_job(&mut self) {
        info!(
            "Countdown at {:?}s inside firing window, launching prediction job",
            self.state.last_observed
        );

        let job = self.job.clone();
        let metrics = self.metrics.clone();
        self.job_handle = Some(tokio::spawn(async move {
            let started = Instant::now();
            let outcome = job.run().await;
            let elapsed = started.elapsed().as_secs_f64();

            match outcome {
                Ok(report) => {
                    metrics.observe_job("recorded", elapsed);
                    info!(
                        "Prediction job done in {:.3}s: cycle {} pending, {} slots verified",
                        elapsed, report.target_cycle_id, report.verified
                    );
                }
                Err(e) => {
                    metrics.observe_job(e.label(), elapsed);
                    warn!("Prediction job skipped this cycle: {}", e);
                }
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::prediction_job::{JobError, JobReport};
    use crate::domain::errors::LedgerError;
    use crate::infrastructure::mock::ScriptedCountdownSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl PredictionJob for CountingJob {
        async fn run(&self) -> Result<JobReport, JobError> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(JobReport {
                target_cycle_id: format!("{:05}", n),
                verified: 0,
            })
        }
    }

    /// Always fails, either with a ledger error or by panicking
    struct FailingJob {
        runs: AtomicUsize,
        panic: bool,
    }

    impl FailingJob {
        fn new(panic: bool) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                panic,
            }
        }
    }

    #[async_trait]
    impl PredictionJob for FailingJob {
        async fn run(&self) -> Result<JobReport, JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("scorer model exploded");
            }
            Err(JobError::Ledger(LedgerError::SlotMismatch {
                cycle_id: "00013".to_string(),
                expected: 5,
                actual: 4,
            }))
        }
    }

    struct SlowSource;

    #[async_trait]
    impl CountdownSource for SlowSource {
        async fn read_countdown_seconds(&self) -> Result<i64, ReadError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(40)
        }

        async fn request_refresh(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn scheduler(
        source: Arc<dyn CountdownSource>,
        job: Arc<dyn PredictionJob>,
        config: CycleConfig,
    ) -> CountdownScheduler {
        CountdownScheduler::new(source, job, config, Metrics::new().unwrap())
    }

    async fn let_tasks_run() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    async fn tick_through(scheduler: &mut CountdownScheduler, ticks: usize) -> Vec<TickDecision> {
        let mut decisions = Vec::new();
        for _ in 0..ticks {
            decisions.push(scheduler.run_scheduler_cycle().await);
            let_tasks_run().await;
        }
        decisions
    }

    #[tokio::test]
    async fn test_fires_once_per_cycle() {
        let values = [60, 45, 30, 28, 27, 20, 15, 10, 1, 0, 60, 40, 28, 20, 5, 0];
        let source = Arc::new(ScriptedCountdownSource::from_values(&values));
        let job = Arc::new(CountingJob::default());
        let mut scheduler = scheduler(source, job.clone(), CycleConfig::default());

        let decisions = tick_through(&mut scheduler, values.len()).await;
        scheduler.drain().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
        let fired: Vec<u32> = decisions
            .iter()
            .filter(|d| d.fire)
            .filter_map(|d| d.countdown)
            .collect();
        assert_eq!(fired, vec![28, 28]);
        assert_eq!(decisions.iter().filter(|d| d.rollover).count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_errors_request_one_refresh() {
        let errors = (0..5)
            .map(|_| {
                Err(ReadError::Transient {
                    reason: "offline".to_string(),
                })
            })
            .collect();
        let source = Arc::new(ScriptedCountdownSource::new(errors));
        let job = Arc::new(CountingJob::default());
        let mut scheduler = scheduler(source.clone(), job.clone(), CycleConfig::default());

        let decisions = tick_through(&mut scheduler, 5).await;

        assert_eq!(decisions.iter().filter(|d| d.request_refresh).count(), 1);
        assert!(decisions[4].request_refresh);
        assert_eq!(source.refresh_requests(), 1);
        assert_eq!(scheduler.state().consecutive_errors, 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_read_counts_as_timeout() {
        let d = CycleConfig::default();
        let config = CycleConfig::new(
            d.poll_interval,
            d.fire_window.clone(),
            d.rollover_floor_secs,
            d.rollover_threshold_secs,
            d.max_countdown_secs,
            d.error_threshold,
            d.error_decay,
            Duration::from_millis(20),
            d.shutdown_grace,
        )
        .unwrap();
        let mut scheduler = scheduler(Arc::new(SlowSource), Arc::new(CountingJob::default()), config);

        let decision = scheduler.run_scheduler_cycle().await;

        assert!(matches!(decision.read_error, Some(ReadError::Timeout { .. })));
        assert_eq!(scheduler.state().consecutive_errors, 1);
        assert_eq!(scheduler.state().last_observed, None);
    }

    async fn assert_failed_job_is_reaped(panic: bool) {
        let values = [40, 28, 27, 20, 1, 0, 60, 28, 20];
        let source = Arc::new(ScriptedCountdownSource::from_values(&values));
        let job = Arc::new(FailingJob::new(panic));
        let mut scheduler = scheduler(source, job.clone(), CycleConfig::default());

        let first = tick_through(&mut scheduler, 2).await;
        assert!(first[1].fire);
        assert!(scheduler.job_in_flight());

        // Next tick reaps the failed job, the cycle stays fired
        let decision = scheduler.run_scheduler_cycle().await;
        assert!(!decision.fire);
        assert!(!scheduler.job_in_flight());
        assert!(scheduler.state().fired_this_cycle);
        let_tasks_run().await;

        let rest = tick_through(&mut scheduler, values.len() - 3).await;
        scheduler.drain().await;

        let fired: Vec<u32> = rest
            .iter()
            .filter(|d| d.fire)
            .filter_map(|d| d.countdown)
            .collect();
        assert_eq!(fired, vec![28]);
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_job_fires_again_next_cycle_only() {
        assert_failed_job_is_reaped(false).await;
    }

    #[tokio::test]
    async fn test_panicked_job_fires_again_next_cycle_only() {
        assert_failed_job_is_reaped(true).await;
    }

    #[tokio::test]
    async fn test_invalid_reading_never_fires() {
        let source = Arc::new(ScriptedCountdownSource::from_values(&[-3, 500, 20]));
        let job = Arc::new(CountingJob::default());
        let mut scheduler = scheduler(source, job.clone(), CycleConfig::default());

        let decisions = tick_through(&mut scheduler, 3).await;
        scheduler.drain().await;

        assert!(!decisions[0].fire && !decisions[1].fire);
        assert!(decisions[2].fire);
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let d = CycleConfig::default();
        let config = CycleConfig::new(
            Duration::from_millis(10),
            d.fire_window.clone(),
            d.rollover_floor_secs,
            d.rollover_threshold_secs,
            d.max_countdown_secs,
            d.error_threshold,
            d.error_decay,
            d.read_timeout,
            d.shutdown_grace,
        )
        .unwrap();
        let source = Arc::new(ScriptedCountdownSource::from_values(&[40, 30, 28, 27]));
        let job = Arc::new(CountingJob::default());
        let scheduler = scheduler(source, job.clone(), config);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }
}
