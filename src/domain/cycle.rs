//! Countdown cycle state machine.
//!
//! `CycleState` is a plain value: the scheduler passes it into `on_tick` together
//! with the latest countdown reading and gets the next state plus a decision back.
//! No timers or I/O live here, so every transition is unit-testable.

use std::time::Instant;

use crate::domain::config::CycleConfig;
use crate::domain::errors::ReadError;

/// Logical scheduler state within one countdown cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// No prediction fired this cycle
    Idle,
    /// Prediction job in flight
    Firing,
    /// Prediction fired, waiting for rollover
    Fired,
}

/// Transient scheduler state, reset at start-up and on every rollover
#[derive(Debug, Clone, PartialEq)]
pub struct CycleState {
    pub last_observed: Option<u32>,
    pub fired_this_cycle: bool,
    pub firing_in_flight: bool,
    pub consecutive_errors: u32,
    pub last_error_at: Option<Instant>,
    pub last_reset_at: Instant,
}

/// What the scheduler must do after a tick
#[derive(Debug, Default)]
pub struct TickDecision {
    /// Validated countdown value, when the read succeeded
    pub countdown: Option<u32>,
    /// Launch the prediction job now
    pub fire: bool,
    /// Ask the countdown source to refresh itself (best-effort)
    pub request_refresh: bool,
    /// A new cycle started on this tick
    pub rollover: bool,
    pub read_error: Option<ReadError>,
}

impl CycleState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_observed: None,
            fired_this_cycle: false,
            firing_in_flight: false,
            consecutive_errors: 0,
            last_error_at: None,
            last_reset_at: now,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        if self.firing_in_flight {
            CyclePhase::Firing
        } else if self.fired_this_cycle {
            CyclePhase::Fired
        } else {
            CyclePhase::Idle
        }
    }

    /// Advance the state machine by one poll.
    pub fn on_tick(
        mut self,
        reading: Result<i64, ReadError>,
        now: Instant,
        config: &CycleConfig,
    ) -> (Self, TickDecision) {
        let mut decision = TickDecision::default();

        self.decay_errors(now, config);

        match reading.and_then(|raw| validate_reading(raw, config)) {
            Err(err) => {
                self.consecutive_errors += 1;
                self.last_error_at = Some(now);

                if self.consecutive_errors >= config.error_threshold {
                    decision.request_refresh = true;
                    self.consecutive_errors = 0;
                }
                decision.read_error = Some(err);
            }
            Ok(seconds) => {
                decision.countdown = Some(seconds);
                let previous = self.last_observed;

                if let Some(prev) = previous
                    && prev <= config.rollover_floor_secs
                    && seconds > config.rollover_threshold_secs
                {
                    self.fired_this_cycle = false;
                    self.consecutive_errors = 0;
                    self.last_reset_at = now;
                    decision.rollover = true;
                }

                if previous != Some(seconds) {
                    self.last_observed = Some(seconds);
                    self.consecutive_errors = 0;
                }

                if !self.fired_this_cycle
                    && !self.firing_in_flight
                    && config.in_fire_window(seconds)
                {
                    self.fired_this_cycle = true;
                    self.firing_in_flight = true;
                    decision.fire = true;
                }

                if seconds <= config.early_reset_secs {
                    self.fired_this_cycle = false;
                }
            }
        }

        (self, decision)
    }

    /// Mark the in-flight prediction job as finished, whatever its outcome.
    /// The fired flag is left untouched so the cycle cannot fire again.
    pub fn on_firing_complete(mut self) -> Self {
        self.firing_in_flight = false;
        self
    }

    fn decay_errors(&mut self, now: Instant, config: &CycleConfig) {
        if self.consecutive_errors == 0 {
            return;
        }
        if let Some(last) = self.last_error_at
            && now.saturating_duration_since(last) >= config.error_decay
        {
            self.consecutive_errors = 0;
        }
    }
}

fn validate_reading(raw: i64, config: &CycleConfig) -> Result<u32, ReadError> {
    if raw < 0 || raw > config.max_countdown_secs as i64 {
        return Err(ReadError::InvalidCountdownValue {
            value: raw,
            max: config.max_countdown_secs,
        });
    }
    Ok(raw as u32)
}
