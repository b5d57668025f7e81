//! Published world state.
//!
//! The engine rebuilds a [`WorldSnapshot`] after every tick and swaps it
//! behind an `Arc`. Presentation code clones the `Arc` and reads at its own
//! pace; it never sees a half-updated tick and never touches live state.

use crate::pool::{Tier, TierArrays, TieredAgentPool};
use crate::resources::ResourceNodeSnapshot;
use crate::scheduler::{BudgetStatus, DegradationSignal};
use serde::{Deserialize, Serialize};

/// Per-tier agent state copied out for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSnapshot {
    pub tier: Tier,
    pub px: Vec<f32>,
    pub py: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub caste: Vec<u8>,
    pub maturity: Vec<f32>,
    pub flags: Vec<u32>,
}

impl TierSnapshot {
    pub(crate) fn from_arrays(tier: Tier, arr: &TierArrays) -> Self {
        Self {
            tier,
            px: arr.px.clone(),
            py: arr.py.clone(),
            vx: arr.vx.clone(),
            vy: arr.vy.clone(),
            caste: arr.caste.clone(),
            maturity: arr.maturity.clone(),
            flags: arr.flags.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.px.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.px.is_empty()
    }
}

/// Immutable copy of everything the presentation layer may want, versioned
/// by tick number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    /// Simulation time in seconds (tick * dt, not wall time).
    pub sim_time: f64,
    pub tiers: Vec<TierSnapshot>,
    pub resources: Vec<ResourceNodeSnapshot>,
    /// Pheromone grid normalized to [0, 1], row-major.
    pub heatmap: Vec<f32>,
    pub field_resolution: usize,
    pub coherence_index: f32,
    pub budget_status: BudgetStatus,
    /// Present while a sustained budget collapse is in effect.
    pub degradation: Option<DegradationSignal>,
}

impl WorldSnapshot {
    /// Snapshot of an engine that has not ticked yet. The nodes exist from
    /// construction, so readers see a consistent world before tick 1.
    pub(crate) fn initial(
        pool: &TieredAgentPool,
        field_resolution: usize,
        resources: Vec<ResourceNodeSnapshot>,
    ) -> Self {
        Self {
            tick: 0,
            sim_time: 0.0,
            tiers: [Tier::Detailed, Tier::Batched, Tier::Statistical]
                .iter()
                .map(|&t| TierSnapshot::from_arrays(t, pool.tier(t)))
                .collect(),
            resources,
            heatmap: vec![0.0; field_resolution * field_resolution],
            field_resolution,
            coherence_index: 0.0,
            budget_status: BudgetStatus::Nominal,
            degradation: None,
        }
    }

    #[must_use]
    pub fn total_agents(&self) -> usize {
        self.tiers.iter().map(TierSnapshot::len).sum()
    }
}
