//! Tiered agent population stored as structure-of-arrays.
//!
//! Three fidelity tiers share one layout so level-of-detail transfers are a
//! plain row move. Capacity is fixed at construction; a transfer that would
//! exceed a tier's capacity is a hard [`EngineError::TierCapacity`], never a
//! silent drop.

use crate::caste::assign_castes;
use crate::config::{TierConfig, WorldConfig};
use crate::error::EngineError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Simulation fidelity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Full steering: gradient, cohesion, jitter, deposits, harvests.
    Detailed,
    /// Gradient plus proxy alignment; harvests, never deposits.
    Batched,
    /// Drift only; neither harvests nor deposits.
    Statistical,
}

pub const TIER_COUNT: usize = 3;

impl Tier {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Tier::Detailed => 0,
            Tier::Batched => 1,
            Tier::Statistical => 2,
        }
    }

    /// One step toward higher fidelity, if any.
    #[must_use]
    pub fn promoted(self) -> Option<Tier> {
        match self {
            Tier::Detailed => None,
            Tier::Batched => Some(Tier::Detailed),
            Tier::Statistical => Some(Tier::Batched),
        }
    }

    /// One step toward lower fidelity, if any.
    #[must_use]
    pub fn demoted(self) -> Option<Tier> {
        match self {
            Tier::Detailed => Some(Tier::Batched),
            Tier::Batched => Some(Tier::Statistical),
            Tier::Statistical => None,
        }
    }
}

/// Agent state flag bits, stored in the integer `flags` column.
pub mod flags {
    pub const SEEKING_FOOD: u32 = 1 << 0;
    pub const RETURNING: u32 = 1 << 1;
    pub const WARMING: u32 = 1 << 2;
    pub const DEAD: u32 = 1 << 3;
    pub const FORESHADOW_DEATH: u32 = 1 << 4;

    /// Bits managed by the level-of-detail controller, cleared on transfer.
    pub const PENDING_PROMOTE: u32 = 1 << 6;
    pub const PENDING_DEMOTE: u32 = 1 << 7;
    pub const LOD_PENDING_MASK: u32 = PENDING_PROMOTE | PENDING_DEMOTE;
}

/// One agent's full row, used when moving agents between tiers.
#[derive(Debug, Clone, Copy)]
pub struct AgentRow {
    pub px: f32,
    pub py: f32,
    pub vx: f32,
    pub vy: f32,
    pub caste: u8,
    pub maturity: f32,
    pub flags: u32,
}

/// Structure-of-arrays storage for one tier.
#[derive(Debug, Clone)]
pub struct TierArrays {
    pub px: Vec<f32>,
    pub py: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub caste: Vec<u8>,
    pub maturity: Vec<f32>,
    pub flags: Vec<u32>,
    /// Seconds of continuous LOD eligibility in the pending direction.
    pub residency: Vec<f32>,
    capacity: usize,
}

impl TierArrays {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            px: Vec::with_capacity(capacity),
            py: Vec::with_capacity(capacity),
            vx: Vec::with_capacity(capacity),
            vy: Vec::with_capacity(capacity),
            caste: Vec::with_capacity(capacity),
            maturity: Vec::with_capacity(capacity),
            flags: Vec::with_capacity(capacity),
            residency: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.px.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.px.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a row, enforcing the tier's capacity.
    pub fn push(&mut self, tier: Tier, row: AgentRow) -> Result<(), EngineError> {
        if self.len() >= self.capacity {
            return Err(EngineError::TierCapacity {
                tier,
                capacity: self.capacity,
            });
        }
        self.px.push(row.px);
        self.py.push(row.py);
        self.vx.push(row.vx);
        self.vy.push(row.vy);
        self.caste.push(row.caste);
        self.maturity.push(row.maturity);
        self.flags.push(row.flags);
        self.residency.push(0.0);
        Ok(())
    }

    /// Removes a row in O(1), swapping the last row into its place.
    pub fn swap_remove(&mut self, idx: usize) -> AgentRow {
        let row = AgentRow {
            px: self.px.swap_remove(idx),
            py: self.py.swap_remove(idx),
            vx: self.vx.swap_remove(idx),
            vy: self.vy.swap_remove(idx),
            caste: self.caste.swap_remove(idx),
            maturity: self.maturity.swap_remove(idx),
            flags: self.flags.swap_remove(idx),
        };
        self.residency.swap_remove(idx);
        row
    }

    /// Positions as tuples, for batched field and resource queries.
    #[must_use]
    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.px
            .iter()
            .zip(&self.py)
            .map(|(&x, &y)| (x, y))
            .collect()
    }

    /// Mean velocity over the tier, zero for an empty tier.
    #[must_use]
    pub fn mean_velocity(&self) -> (f32, f32) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.len() as f32;
        let sx: f32 = self.vx.iter().sum();
        let sy: f32 = self.vy.iter().sum();
        (sx / n, sy / n)
    }
}

/// The full population, partitioned by tier.
#[derive(Debug, Clone)]
pub struct TieredAgentPool {
    tiers: [TierArrays; TIER_COUNT],
}

impl TieredAgentPool {
    /// Spawns the configured quotas near the colony center. Castes are
    /// assigned across the whole population (10/60/30) and shuffled, then
    /// dealt into tiers in order, so every tier holds a caste mix. All agents
    /// start seeking food with a small random velocity.
    pub fn spawn<R: Rng>(
        tiers: &TierConfig,
        world: &WorldConfig,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let quotas = [
            tiers.detailed_quota,
            tiers.batched_quota,
            tiers.statistical_quota,
        ];
        let capacities = [
            tiers.detailed_capacity,
            tiers.batched_capacity,
            tiers.statistical_capacity,
        ];
        let total: usize = quotas.iter().sum();
        let castes = assign_castes(total, rng);

        let mut pool = Self {
            tiers: [
                TierArrays::with_capacity(capacities[0]),
                TierArrays::with_capacity(capacities[1]),
                TierArrays::with_capacity(capacities[2]),
            ],
        };

        let tier_order = [Tier::Detailed, Tier::Batched, Tier::Statistical];
        let mut next_caste = 0;
        for (t, &quota) in tier_order.iter().zip(&quotas) {
            for _ in 0..quota {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let dist = rng.gen_range(0.0..world.colony_radius);
                let speed = rng.gen_range(0.0..10.0);
                let heading = rng.gen_range(0.0..std::f32::consts::TAU);
                let row = AgentRow {
                    px: world.colony_x + dist * angle.cos(),
                    py: world.colony_y + dist * angle.sin(),
                    vx: speed * heading.cos(),
                    vy: speed * heading.sin(),
                    caste: castes[next_caste],
                    maturity: 0.0,
                    flags: flags::SEEKING_FOOD,
                };
                next_caste += 1;
                pool.tiers[t.index()].push(*t, row)?;
            }
        }
        Ok(pool)
    }

    #[inline]
    #[must_use]
    pub fn tier(&self, tier: Tier) -> &TierArrays {
        &self.tiers[tier.index()]
    }

    #[inline]
    #[must_use]
    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierArrays {
        &mut self.tiers[tier.index()]
    }

    #[must_use]
    pub fn total_len(&self) -> usize {
        self.tiers.iter().map(TierArrays::len).sum()
    }

    /// Simultaneous mutable access to the two interactive tiers, for passes
    /// that span both.
    pub fn detailed_batched_mut(&mut self) -> (&mut TierArrays, &mut TierArrays) {
        let (head, tail) = self.tiers.split_at_mut(1);
        (&mut head[0], &mut tail[0])
    }

    /// Moves one agent between tiers, carrying its velocity unchanged and
    /// zeroing its residency timer and pending-LOD bits. Fails without
    /// mutating anything if the destination is full.
    pub fn transfer(&mut self, from: Tier, to: Tier, idx: usize) -> Result<(), EngineError> {
        let dst = &self.tiers[to.index()];
        if dst.len() >= dst.capacity() {
            return Err(EngineError::TierCapacity {
                tier: to,
                capacity: dst.capacity(),
            });
        }
        let mut row = self.tiers[from.index()].swap_remove(idx);
        row.flags &= !flags::LOD_PENDING_MASK;
        self.tiers[to.index()].push(to, row)
    }
}
