//! Configuration management for simulation parameters.
//!
//! Strongly-typed configuration structures that map to a `config.toml` file.
//! Defaults reproduce the reference colony tuning; every parameter is
//! validated before the engine is allowed to tick.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 1000.0
//! height = 1000.0
//! seed = 42
//!
//! [field]
//! resolution = 128
//! decay_factor = 0.94
//!
//! [lod]
//! promote_window = 0.5
//! demote_window = 2.0
//! ```

use serde::{Deserialize, Serialize};

/// World geometry and determinism settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub colony_x: f32,
    pub colony_y: f32,
    pub colony_radius: f32,
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            colony_x: 500.0,
            colony_y: 500.0,
            colony_radius: 30.0,
            seed: None,
        }
    }
}

/// Per-tier population quotas and hard capacities.
///
/// Quotas are the counts spawned at startup; capacities bound how far a tier
/// may grow through promotions/demotions before the engine reports a hard
/// error.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TierConfig {
    pub detailed_quota: usize,
    pub batched_quota: usize,
    pub statistical_quota: usize,
    pub detailed_capacity: usize,
    pub batched_capacity: usize,
    pub statistical_capacity: usize,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            detailed_quota: 300,
            batched_quota: 2000,
            statistical_quota: 22_700,
            detailed_capacity: 600,
            batched_capacity: 4000,
            statistical_capacity: 25_000,
        }
    }
}

/// Pheromone field grid and gradient parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FieldConfig {
    pub resolution: usize,
    /// Per-tick exponential decay multiplier, strictly inside (0, 1).
    pub decay_factor: f32,
    /// Upper bound on any cell's intensity.
    pub ceiling: f32,
    /// Constant pulse added per deposit.
    pub deposit_amplitude: f32,
    /// Maximum magnitude a sampled gradient vector may carry.
    pub gradient_clamp: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            resolution: 128,
            decay_factor: 0.94,
            ceiling: 4.0,
            deposit_amplitude: 1.0,
            gradient_clamp: 5.0,
        }
    }
}

/// Resource node placement, harvest, and regeneration parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ResourceConfig {
    pub node_count: usize,
    pub max_stock: f32,
    /// Stock regenerated per second, clipped at `max_stock`.
    pub regen_rate: f32,
    pub harvest_base: f32,
    /// Standard deviation of the zero-mean harvest noise.
    pub harvest_noise_std: f32,
    pub contact_radius: f32,
    /// Nodes spawn on a ring around the colony center within these radii.
    pub spawn_radius_min: f32,
    pub spawn_radius_max: f32,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            node_count: 5,
            max_stock: 1.0,
            regen_rate: 0.01,
            harvest_base: 0.1,
            harvest_noise_std: 0.15,
            contact_radius: 20.0,
            spawn_radius_min: 250.0,
            spawn_radius_max: 450.0,
        }
    }
}

/// Agent movement and steering parameters shared by all tier kernels.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MovementConfig {
    /// Hard speed bound before caste multipliers.
    pub max_speed: f32,
    /// Velocity multiplier applied each tick after steering.
    pub damping: f32,
    /// Weight pulling agents toward the colony center.
    pub cohesion_weight: f32,
    /// Weight pulling the batched tier toward the detailed tier's mean velocity.
    pub proxy_alignment_weight: f32,
    /// Base standard deviation of the per-agent steering jitter.
    pub jitter_base: f32,
    /// Maturity gained per second, clamped at 1.0.
    pub maturity_rate: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 80.0,
            damping: 0.98,
            cohesion_weight: 0.6,
            proxy_alignment_weight: 0.3,
            jitter_base: 2.0,
            maturity_rate: 0.002,
        }
    }
}

/// Level-of-detail hysteresis windows and distance thresholds.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LodConfig {
    /// Seconds of continuous eligibility before promotion.
    pub promote_window: f32,
    /// Seconds of continuous eligibility before demotion. Must exceed
    /// `promote_window`; the asymmetry is what suppresses tier flicker.
    pub demote_window: f32,
    /// Agents closer than this to the focus belong in the detailed tier.
    pub detailed_distance: f32,
    /// Agents closer than this (but beyond `detailed_distance`) belong in
    /// the batched tier; beyond it, the statistical tier.
    pub batched_distance: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            promote_window: 0.5,
            demote_window: 2.0,
            detailed_distance: 150.0,
            batched_distance: 400.0,
        }
    }
}

/// Fixed-step scheduling and frame-budget thresholds.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BudgetConfig {
    pub tick_hz: u32,
    /// Tick duration above this is classified `Warning`.
    pub warning_ms: f32,
    /// Tick duration above this is classified `Collapse`.
    pub collapse_ms: f32,
    /// Consecutive collapse ticks before a degradation signal is emitted.
    pub collapse_streak: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            warning_ms: 10.0,
            collapse_ms: 15.0,
            collapse_streak: 3,
        }
    }
}

/// Dissent-invariant partition and alignment thresholds.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CoherenceConfig {
    /// Bucket grid resolution per axis for the alignment check.
    pub bucket_cells: usize,
    /// Fraction of max speed a bucket's mean velocity must exceed to count
    /// as over-aligned.
    pub alignment_threshold: f32,
    /// Fraction of an over-aligned bucket's agents that receive noise.
    pub dissent_fraction: f32,
    /// Buckets with fewer agents than this are ignored.
    pub min_bucket_population: usize,
    /// Seconds between swarm coherence index samples.
    pub sample_interval: f32,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            bucket_cells: 32,
            alignment_threshold: 0.8,
            dissent_fraction: 0.2,
            min_bucket_population: 3,
            sample_interval: 0.5,
        }
    }
}

/// Top-level simulation configuration, immutable after engine construction.
///
/// Sections omitted from the TOML file fall back to their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub tiers: TierConfig,
    pub field: FieldConfig,
    pub resources: ResourceConfig,
    pub movement: MovementConfig,
    pub lod: LodConfig,
    pub budget: BudgetConfig,
    pub coherence: CoherenceConfig,
}

impl SimConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a
    /// description of the first validation failure. A config that fails here
    /// must never reach the tick loop.
    pub fn validate(&self) -> anyhow::Result<()> {
        // World
        anyhow::ensure!(self.world.width > 0.0, "World width must be positive");
        anyhow::ensure!(self.world.height > 0.0, "World height must be positive");
        anyhow::ensure!(
            self.world.colony_x >= 0.0 && self.world.colony_x <= self.world.width,
            "Colony center X must lie inside the world"
        );
        anyhow::ensure!(
            self.world.colony_y >= 0.0 && self.world.colony_y <= self.world.height,
            "Colony center Y must lie inside the world"
        );

        // Tiers
        anyhow::ensure!(
            self.tiers.detailed_quota <= self.tiers.detailed_capacity,
            "Detailed quota exceeds capacity"
        );
        anyhow::ensure!(
            self.tiers.batched_quota <= self.tiers.batched_capacity,
            "Batched quota exceeds capacity"
        );
        anyhow::ensure!(
            self.tiers.statistical_quota <= self.tiers.statistical_capacity,
            "Statistical quota exceeds capacity"
        );
        anyhow::ensure!(
            self.tiers.detailed_quota
                + self.tiers.batched_quota
                + self.tiers.statistical_quota
                > 0,
            "Total population must be positive"
        );

        // Field
        anyhow::ensure!(self.field.resolution >= 2, "Field resolution too small");
        anyhow::ensure!(
            self.field.resolution <= 2048,
            "Field resolution too large (max 2048)"
        );
        anyhow::ensure!(
            self.field.decay_factor > 0.0 && self.field.decay_factor < 1.0,
            "Decay factor must be in (0.0, 1.0)"
        );
        anyhow::ensure!(self.field.ceiling > 0.0, "Field ceiling must be positive");
        anyhow::ensure!(
            self.field.deposit_amplitude > 0.0,
            "Deposit amplitude must be positive"
        );
        anyhow::ensure!(
            self.field.gradient_clamp > 0.0,
            "Gradient clamp must be positive"
        );

        // Resources
        anyhow::ensure!(self.resources.node_count > 0, "Node count must be positive");
        anyhow::ensure!(self.resources.max_stock > 0.0, "Max stock must be positive");
        anyhow::ensure!(
            self.resources.regen_rate >= 0.0,
            "Regen rate must be non-negative"
        );
        anyhow::ensure!(
            self.resources.harvest_base > 0.0,
            "Harvest base must be positive"
        );
        anyhow::ensure!(
            self.resources.harvest_noise_std >= 0.0,
            "Harvest noise std must be non-negative"
        );
        anyhow::ensure!(
            self.resources.contact_radius > 0.0,
            "Contact radius must be positive"
        );
        anyhow::ensure!(
            self.resources.spawn_radius_min <= self.resources.spawn_radius_max,
            "Resource spawn radii inverted"
        );

        // Movement
        anyhow::ensure!(self.movement.max_speed > 0.0, "Max speed must be positive");
        anyhow::ensure!(
            self.movement.damping > 0.0 && self.movement.damping <= 1.0,
            "Damping must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            self.movement.maturity_rate >= 0.0,
            "Maturity rate must be non-negative"
        );

        // Lod
        anyhow::ensure!(
            self.lod.promote_window > 0.0,
            "Promote window must be positive"
        );
        anyhow::ensure!(
            self.lod.demote_window > self.lod.promote_window,
            "Demote window must be strictly greater than promote window"
        );
        anyhow::ensure!(
            self.lod.detailed_distance > 0.0
                && self.lod.batched_distance > self.lod.detailed_distance,
            "LOD distances must be positive and strictly increasing"
        );

        // Budget
        anyhow::ensure!(self.budget.tick_hz > 0, "Tick rate must be positive");
        anyhow::ensure!(self.budget.tick_hz <= 240, "Tick rate too high (max 240)");
        anyhow::ensure!(
            self.budget.warning_ms > 0.0 && self.budget.collapse_ms > self.budget.warning_ms,
            "Budget thresholds must be positive and strictly increasing"
        );
        anyhow::ensure!(
            self.budget.collapse_streak > 0,
            "Collapse streak must be positive"
        );

        // Coherence
        anyhow::ensure!(
            self.coherence.bucket_cells >= 2,
            "Coherence bucket grid too small"
        );
        anyhow::ensure!(
            self.coherence.alignment_threshold > 0.0 && self.coherence.alignment_threshold <= 1.0,
            "Alignment threshold must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            self.coherence.dissent_fraction >= 0.0 && self.coherence.dissent_fraction <= 1.0,
            "Dissent fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.coherence.sample_interval > 0.0,
            "Coherence sample interval must be positive"
        );

        Ok(())
    }

    /// Loads and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fixed timestep in seconds derived from the configured tick rate.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.budget.tick_hz as f32
    }

    /// Stable hash of every behavior-affecting parameter, for reproducibility
    /// tracking across runs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.tiers).as_bytes());
        hasher.update(format!("{:?}", self.field).as_bytes());
        hasher.update(format!("{:?}", self.resources).as_bytes());
        hasher.update(format!("{:?}", self.movement).as_bytes());
        hasher.update(format!("{:?}", self.lod).as_bytes());
        hasher.update(format!("{:?}", self.coherence).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_decay_factor_bounds() {
        let mut config = SimConfig::default();
        config.field.decay_factor = 1.0;
        assert!(config.validate().is_err());
        config.field.decay_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_demote_window_must_exceed_promote() {
        let mut config = SimConfig::default();
        config.lod.demote_window = config.lod.promote_window;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quota_over_capacity_rejected() {
        let mut config = SimConfig::default();
        config.tiers.detailed_quota = config.tiers.detailed_capacity + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_budget_thresholds_ordered() {
        let mut config = SimConfig::default();
        config.budget.collapse_ms = config.budget.warning_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial_override() {
        let config = SimConfig::from_toml(
            r#"
            [field]
            decay_factor = 0.9

            [world]
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.field.decay_factor, 0.9);
        assert_eq!(config.world.seed, Some(42));
        assert_eq!(config.budget.tick_hz, 30);
    }

    #[test]
    fn test_fingerprint_consistency() {
        let config1 = SimConfig::default();
        let config2 = SimConfig::default();
        assert_eq!(config1.fingerprint(), config2.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_tuning() {
        let config1 = SimConfig::default();
        let mut config2 = SimConfig::default();
        config2.field.decay_factor = 0.9;
        assert_ne!(config1.fingerprint(), config2.fingerprint());
    }
}
