//! The engine: owns all simulation state and advances it at a fixed rate.
//!
//! One `tick()` is the unit of simulation. `advance()` converts wall-clock
//! deltas into whole ticks through the fixed-step clock, so embedding code
//! can call it from any render loop without affecting behavior. After each
//! tick a fresh snapshot is published behind an `Arc`; readers never touch
//! live state.

use crate::caste::CasteTable;
use crate::coherence::{CoherenceGrid, CoherenceMonitor};
use crate::config::SimConfig;
use crate::error::EngineError;
use crate::field::PheromoneField;
use crate::kernels::{
    self, batched_kernel, detailed_kernel, statistical_kernel, KernelCtx,
};
use crate::lod::LodController;
use crate::metrics::Metrics;
use crate::pool::{flags, Tier, TieredAgentPool};
use crate::resources::ResourceSet;
use crate::scheduler::{BudgetMonitor, BudgetStatus, DegradationSignal, SimulationClock};
use crate::snapshot::{TierSnapshot, WorldSnapshot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct Engine {
    config: SimConfig,
    castes: CasteTable,
    pool: TieredAgentPool,
    field: PheromoneField,
    resources: ResourceSet,
    lod: LodController,
    clock: SimulationClock,
    budget: BudgetMonitor,
    coherence_grid: CoherenceGrid,
    coherence_monitor: CoherenceMonitor,
    metrics: Metrics,
    rng: ChaCha8Rng,
    tick: u64,
    sim_time: f64,
    snapshot: Arc<WorldSnapshot>,
    degradation: Option<DegradationSignal>,
    scratch_pos: Vec<(f32, f32)>,
    scratch_grad: Vec<(f32, f32)>,
}

impl Engine {
    /// Validates the configuration and builds the initial world. A config
    /// rejected by [`SimConfig::validate`] never reaches the tick loop.
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let mut rng = match config.world.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let pool = TieredAgentPool::spawn(&config.tiers, &config.world, &mut rng)?;
        let field = PheromoneField::new(&config.field, config.world.width, config.world.height);
        let resources = ResourceSet::new(
            &config.resources,
            config.world.width,
            config.world.height,
            config.world.colony_x,
            config.world.colony_y,
            &mut rng,
        );
        let lod = LodController::new(
            config.lod.clone(),
            (config.world.colony_x, config.world.colony_y),
        );
        let clock = SimulationClock::new(config.budget.tick_hz);
        let budget = BudgetMonitor::new(&config.budget);
        let coherence_grid =
            CoherenceGrid::new(&config.coherence, config.world.width, config.world.height);
        let coherence_monitor = CoherenceMonitor::new(config.coherence.sample_interval);
        let snapshot = Arc::new(WorldSnapshot::initial(
            &pool,
            config.field.resolution,
            resources.snapshot(),
        ));

        info!(
            agents = pool.total_len(),
            fingerprint = %config.fingerprint(),
            seed = ?config.world.seed,
            "engine constructed"
        );

        Ok(Self {
            config,
            castes: CasteTable::default(),
            pool,
            field,
            resources,
            lod,
            clock,
            budget,
            coherence_grid,
            coherence_monitor,
            metrics: Metrics::new(),
            rng,
            tick: 0,
            sim_time: 0.0,
            snapshot,
            degradation: None,
            scratch_pos: Vec::new(),
            scratch_grad: Vec::new(),
        })
    }

    /// Banks real elapsed seconds and runs every whole fixed step that is
    /// due. Returns how many ticks ran.
    pub fn advance(&mut self, real_dt: f32) -> Result<u32, EngineError> {
        let steps = self.clock.advance(real_dt);
        for _ in 0..steps {
            self.tick()?;
        }
        Ok(steps)
    }

    /// Runs exactly one fixed step. Never aborts mid-tick on a budget
    /// overrun; overruns are classified afterwards.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        let start = Instant::now();
        let dt = self.clock.dt();
        self.tick += 1;
        self.sim_time += f64::from(dt);

        self.lod.plan(&mut self.pool, dt);
        self.field.update();

        let ctx = KernelCtx {
            movement: &self.config.movement,
            world: &self.config.world,
            castes: &self.castes,
            dt,
        };

        detailed_kernel(
            self.pool.tier_mut(Tier::Detailed),
            &self.field,
            &ctx,
            &mut self.rng,
            &mut self.scratch_pos,
            &mut self.scratch_grad,
        );
        let detailed_mean = self.pool.tier(Tier::Detailed).mean_velocity();
        batched_kernel(
            self.pool.tier_mut(Tier::Batched),
            &self.field,
            detailed_mean,
            &ctx,
            &mut self.rng,
            &mut self.scratch_pos,
            &mut self.scratch_grad,
        );
        statistical_kernel(
            self.pool.tier_mut(Tier::Statistical),
            &self.field,
            &ctx,
            &mut self.scratch_pos,
            &mut self.scratch_grad,
        );

        {
            let (detailed, batched) = self.pool.detailed_batched_mut();
            let perturbed = self.coherence_grid.apply_dissent(
                &mut [detailed, batched],
                self.config.movement.max_speed,
                &mut self.rng,
            );
            self.metrics.record_dissent(perturbed as u64);
        }

        self.harvest_and_deposit();
        self.resources.update(dt);

        let planned = self.lod.planned();
        let promotions = planned
            .iter()
            .filter(|t| t.to.index() < t.from.index())
            .count() as u64;
        let demotions = planned.len() as u64 - promotions;
        self.lod.apply(&mut self.pool)?;
        self.metrics.record_transfers(promotions, demotions);

        let coherence_index = {
            let tiers = [
                self.pool.tier(Tier::Detailed),
                self.pool.tier(Tier::Batched),
            ];
            self.coherence_monitor.advance(dt, &[tiers[0], tiers[1]])
        };

        let elapsed = start.elapsed();
        let (status, signal) = self.budget.record(elapsed, self.tick);
        if let Some(signal) = signal {
            self.degradation = Some(signal);
            self.metrics.record_degradation();
        } else if status == BudgetStatus::Nominal {
            self.degradation = None;
        }

        self.publish_snapshot(coherence_index, status);
        self.metrics
            .record_tick(elapsed, status, self.pool.total_len());
        Ok(())
    }

    /// Harvesting for the interactive tiers, then pheromone deposits from
    /// detailed seekers. The statistical tier neither harvests nor deposits.
    fn harvest_and_deposit(&mut self) {
        let base = self.config.resources.harvest_base;
        let world = &self.config.world;

        for tier in [Tier::Detailed, Tier::Batched] {
            let positions = self.pool.tier(tier).positions();
            let harvested = self.resources.harvest(&positions, base, &mut self.rng);
            self.metrics
                .record_harvest(harvested.iter().sum::<f32>());
            kernels::update_forage_state(
                self.pool.tier_mut(tier),
                &harvested,
                world.colony_x,
                world.colony_y,
                world.colony_radius,
            );
        }

        let seekers = kernels::positions_with_flags(
            self.pool.tier(Tier::Detailed),
            flags::SEEKING_FOOD,
        );
        self.field
            .deposit(&seekers, self.config.field.deposit_amplitude);
    }

    fn publish_snapshot(&mut self, coherence_index: f32, status: BudgetStatus) {
        let tiers = [Tier::Detailed, Tier::Batched, Tier::Statistical]
            .iter()
            .map(|&t| TierSnapshot::from_arrays(t, self.pool.tier(t)))
            .collect();
        self.snapshot = Arc::new(WorldSnapshot {
            tick: self.tick,
            sim_time: self.sim_time,
            tiers,
            resources: self.resources.snapshot(),
            heatmap: self.field.heatmap(),
            field_resolution: self.field.resolution(),
            coherence_index,
            budget_status: status,
            degradation: self.degradation,
        });
    }

    /// Latest published snapshot. Cheap to call from any reader.
    #[must_use]
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Pending degradation signal, if a collapse streak is in effect. Cleared
    /// automatically once a tick runs nominal again.
    #[must_use]
    pub fn degradation(&self) -> Option<DegradationSignal> {
        self.degradation
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn field(&self) -> &PheromoneField {
        &self.field
    }

    #[must_use]
    pub fn pool(&self) -> &TieredAgentPool {
        &self.pool
    }

    /// Moves the level-of-detail focus point.
    pub fn set_focus(&mut self, x: f32, y: f32) {
        self.lod.set_focus(x, y);
    }
}
