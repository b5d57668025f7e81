//! Fixed-step scheduling and frame-budget accounting.
//!
//! The clock converts irregular real-time deltas into whole fixed steps via
//! an accumulator, so simulation behavior never depends on the caller's
//! frame rate. The budget monitor classifies each measured tick against the
//! configured thresholds and raises a degradation signal when collapse is
//! sustained; it observes, it never aborts a tick.

use crate::config::BudgetConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many accumulated steps one `advance` call may run before the rest of
/// the backlog is dropped. Bounds the death spiral after a long stall.
const MAX_STEPS_PER_ADVANCE: u32 = 5;

/// Accumulator turning real elapsed time into whole fixed steps.
///
/// The bank is kept in f64: at 30 Hz the f32 step (slightly above 1/30)
/// drifts enough that common deltas like 0.1 s lose a whole step.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    dt: f64,
    accumulator: f64,
}

impl SimulationClock {
    #[must_use]
    pub fn new(tick_hz: u32) -> Self {
        Self {
            dt: 1.0 / f64::from(tick_hz),
            accumulator: 0.0,
        }
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.dt as f32
    }

    /// Banks `real_dt` seconds and returns how many fixed steps to run now.
    /// After a stall longer than the step cap, the excess backlog is
    /// discarded so the simulation slows rather than spiraling.
    pub fn advance(&mut self, real_dt: f32) -> u32 {
        self.accumulator += f64::from(real_dt.max(0.0));
        let mut steps = 0;
        while self.accumulator >= self.dt && steps < MAX_STEPS_PER_ADVANCE {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if self.accumulator >= self.dt {
            self.accumulator %= self.dt;
        }
        steps
    }
}

/// Per-tick budget classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    /// Tick finished inside the warning threshold.
    Nominal,
    /// Over the warning threshold but under collapse.
    Warning,
    /// Over the collapse threshold.
    Collapse,
}

/// Raised after a configured run of consecutive collapse ticks. Advisory:
/// the embedding layer decides what fidelity to shed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationSignal {
    pub status: BudgetStatus,
    /// Duration of the tick that completed the streak, in milliseconds.
    pub tick_ms: f32,
    pub tick: u64,
}

/// Classifies tick durations and tracks collapse streaks.
#[derive(Debug, Clone)]
pub struct BudgetMonitor {
    warning_ms: f32,
    collapse_ms: f32,
    collapse_streak: u32,
    streak: u32,
    last_status: BudgetStatus,
}

impl BudgetMonitor {
    #[must_use]
    pub fn new(cfg: &BudgetConfig) -> Self {
        Self {
            warning_ms: cfg.warning_ms,
            collapse_ms: cfg.collapse_ms,
            collapse_streak: cfg.collapse_streak,
            streak: 0,
            last_status: BudgetStatus::Nominal,
        }
    }

    /// Records one measured tick. Returns the classification and, when this
    /// tick completes a collapse streak, a degradation signal. Any
    /// non-collapse tick clears the streak.
    pub fn record(&mut self, elapsed: Duration, tick: u64) -> (BudgetStatus, Option<DegradationSignal>) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        let status = if ms > self.collapse_ms {
            BudgetStatus::Collapse
        } else if ms > self.warning_ms {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Nominal
        };
        self.last_status = status;

        let signal = if status == BudgetStatus::Collapse {
            self.streak += 1;
            if self.streak >= self.collapse_streak {
                Some(DegradationSignal {
                    status,
                    tick_ms: ms,
                    tick,
                })
            } else {
                None
            }
        } else {
            self.streak = 0;
            None
        };
        (status, signal)
    }

    #[must_use]
    pub fn last_status(&self) -> BudgetStatus {
        self.last_status
    }
}
