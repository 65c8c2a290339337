use crate::domain::draw::DrawRecord;
use crate::domain::errors::ReadError;
use crate::domain::ports::{AuditLog, CountdownSource, DrawFeed};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

pub const DEFAULT_SIMULATED_CYCLE_SECS: i64 = 60;

/// Wall-clock cycle shared by the simulated countdown and draw feed.
///
/// Cycle `n` runs from `n * cycle_secs` to `(n + 1) * cycle_secs` (Unix seconds)
/// and its draw is published when it ends.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedClock {
    cycle_secs: i64,
}

impl SimulatedClock {
    pub fn new(cycle_secs: i64) -> Self {
        Self {
            cycle_secs: cycle_secs.max(2),
        }
    }

    pub fn cycle_secs(&self) -> i64 {
        self.cycle_secs
    }

    pub fn countdown_at(&self, unix_secs: i64) -> i64 {
        self.cycle_secs - 1 - unix_secs.rem_euclid(self.cycle_secs)
    }

    /// Index of the newest completed cycle
    pub fn latest_completed_at(&self, unix_secs: i64) -> i64 {
        unix_secs.div_euclid(self.cycle_secs) - 1
    }

    pub fn draw_for(&self, cycle: i64, slot_count: usize) -> DrawRecord {
        let mut rng = StdRng::seed_from_u64(cycle as u64);
        let numbers = (0..slot_count)
            .map(|_| rng.random_range(0..=9u8).to_string())
            .collect();
        let draw_time: DateTime<Utc> = Utc
            .timestamp_opt((cycle + 1) * self.cycle_secs, 0)
            .single()
            .unwrap_or_else(Utc::now);
        DrawRecord::new(cycle.to_string(), numbers, draw_time)
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_CYCLE_SECS)
    }
}

/// Countdown derived from the local clock, for running without a live source
pub struct SimulatedCountdownSource {
    clock: SimulatedClock,
}

impl SimulatedCountdownSource {
    pub fn new(clock: SimulatedClock) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl CountdownSource for SimulatedCountdownSource {
    async fn read_countdown_seconds(&self) -> Result<i64, ReadError> {
        Ok(self.clock.countdown_at(Utc::now().timestamp()))
    }

    async fn request_refresh(&self) -> Result<()> {
        info!("SimulatedCountdownSource: refresh requested (no-op)");
        Ok(())
    }
}

/// Deterministic pseudo-random draws, one per completed simulated cycle
pub struct SimulatedDrawFeed {
    clock: SimulatedClock,
    slot_count: usize,
    limit: usize,
}

impl SimulatedDrawFeed {
    pub fn new(clock: SimulatedClock, slot_count: usize, limit: usize) -> Self {
        Self {
            clock,
            slot_count,
            limit,
        }
    }

    pub fn records_at(&self, unix_secs: i64) -> Vec<DrawRecord> {
        let latest = self.clock.latest_completed_at(unix_secs);
        let oldest = (latest - self.limit as i64 + 1).max(0);
        (oldest..=latest)
            .map(|cycle| self.clock.draw_for(cycle, self.slot_count))
            .collect()
    }
}

#[async_trait]
impl DrawFeed for SimulatedDrawFeed {
    async fn fetch_latest_records(&self) -> Result<Vec<DrawRecord>> {
        Ok(self.records_at(Utc::now().timestamp()))
    }
}

/// Replays a fixed sequence of readings, then reports the source as unavailable
#[derive(Default)]
pub struct ScriptedCountdownSource {
    readings: Mutex<VecDeque<Result<i64, ReadError>>>,
    refresh_requests: AtomicU32,
}

impl ScriptedCountdownSource {
    pub fn new(readings: Vec<Result<i64, ReadError>>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            refresh_requests: AtomicU32::new(0),
        }
    }

    /// Successful readings only
    pub fn from_values(values: &[i64]) -> Self {
        Self::new(values.iter().map(|v| Ok(*v)).collect())
    }

    pub fn refresh_requests(&self) -> u32 {
        self.refresh_requests.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.readings.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CountdownSource for ScriptedCountdownSource {
    async fn read_countdown_seconds(&self) -> Result<i64, ReadError> {
        let next = self
            .readings
            .lock()
            .map_err(|_| ReadError::Transient {
                reason: "script poisoned".to_string(),
            })?
            .pop_front();

        next.unwrap_or_else(|| {
            Err(ReadError::Transient {
                reason: "script exhausted".to_string(),
            })
        })
    }

    async fn request_refresh(&self) -> Result<()> {
        self.refresh_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Draw feed backed by a mutable list, for wiring tests
#[derive(Default)]
pub struct InMemoryDrawFeed {
    records: Mutex<Vec<DrawRecord>>,
}

impl InMemoryDrawFeed {
    pub fn new(records: Vec<DrawRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn push(&self, record: DrawRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[async_trait]
impl DrawFeed for InMemoryDrawFeed {
    async fn fetch_latest_records(&self) -> Result<Vec<DrawRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("draw feed poisoned"))?;
        Ok(records.clone())
    }
}

/// Audit log kept in memory
#[derive(Default)]
pub struct MemoryAuditLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append_line(&self, line: &str) -> Result<()> {
        self.lines
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}
