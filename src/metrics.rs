//! Runtime metrics and logging setup.

use crate::scheduler::BudgetStatus;
use std::time::Duration;
use tracing::{info, warn};

/// Ticks between periodic metric log lines (10 s at 30 Hz).
const REPORT_INTERVAL_TICKS: u64 = 300;

/// Rolling counters for the engine, reported through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub ticks: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub total_harvested: f64,
    /// Agents whose heading was rotated by the dissent pass.
    pub dissent_perturbations: u64,
    pub degradations: u64,
    pub last_tick_ms: f32,
    tick_ms_accum: f32,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed tick and emits the periodic report line.
    pub fn record_tick(&mut self, elapsed: Duration, status: BudgetStatus, agents: usize) {
        self.ticks += 1;
        self.last_tick_ms = elapsed.as_secs_f32() * 1000.0;
        self.tick_ms_accum += self.last_tick_ms;

        if status == BudgetStatus::Collapse {
            warn!(
                tick = self.ticks,
                tick_ms = self.last_tick_ms,
                agents,
                "tick budget collapsed"
            );
        }

        if self.ticks % REPORT_INTERVAL_TICKS == 0 {
            let avg_ms = self.tick_ms_accum / REPORT_INTERVAL_TICKS as f32;
            info!(
                tick = self.ticks,
                avg_tick_ms = avg_ms,
                agents,
                promotions = self.promotions,
                demotions = self.demotions,
                harvested = self.total_harvested,
                "engine report"
            );
            self.tick_ms_accum = 0.0;
        }
    }

    pub fn record_transfers(&mut self, promotions: u64, demotions: u64) {
        self.promotions += promotions;
        self.demotions += demotions;
    }

    pub fn record_harvest(&mut self, amount: f32) {
        self.total_harvested += amount as f64;
    }

    pub fn record_dissent(&mut self, perturbed: u64) {
        self.dissent_perturbations += perturbed;
    }

    pub fn record_degradation(&mut self) {
        self.degradations += 1;
    }
}

/// Installs the global `tracing` subscriber, honoring `RUST_LOG`. Safe to
/// call more than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
