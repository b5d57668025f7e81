//! Foraging economy: a fixed set of resource nodes with bounded stock,
//! stochastic harvest, and regeneration.
//!
//! Nodes are created once at startup and never destroyed; a depleted node
//! simply has nothing to give until regeneration refills it. Harvesting is a
//! batched all-agents-against-all-nodes distance test, not a per-agent
//! search.

use crate::config::ResourceConfig;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Read-only per-node view exported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceNodeSnapshot {
    pub x: f32,
    pub y: f32,
    pub stock_fraction: f32,
    pub active: bool,
}

/// Fixed resource nodes stored as parallel arrays.
#[derive(Debug, Clone)]
pub struct ResourceSet {
    xs: Vec<f32>,
    ys: Vec<f32>,
    stock: Vec<f32>,
    max_stock: f32,
    regen_rate: f32,
    contact_radius: f32,
    harvest_noise_std: f32,
}

impl ResourceSet {
    /// Places `node_count` nodes on a ring around the colony center, clamped
    /// inside the world margins, from the supplied seeded RNG.
    pub fn new<R: Rng>(
        cfg: &ResourceConfig,
        world_width: f32,
        world_height: f32,
        colony_x: f32,
        colony_y: f32,
        rng: &mut R,
    ) -> Self {
        let mut xs = Vec::with_capacity(cfg.node_count);
        let mut ys = Vec::with_capacity(cfg.node_count);
        for _ in 0..cfg.node_count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let dist = rng.gen_range(cfg.spawn_radius_min..=cfg.spawn_radius_max);
            let x = (colony_x + dist * angle.cos()).clamp(50.0, world_width - 50.0);
            let y = (colony_y + dist * angle.sin()).clamp(50.0, world_height - 50.0);
            xs.push(x);
            ys.push(y);
        }
        Self {
            xs,
            ys,
            stock: vec![cfg.max_stock; cfg.node_count],
            max_stock: cfg.max_stock,
            regen_rate: cfg.regen_rate,
            contact_radius: cfg.contact_radius,
            harvest_noise_std: cfg.harvest_noise_std,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.xs.len()
    }

    #[must_use]
    pub fn stock(&self) -> &[f32] {
        &self.stock
    }

    /// Test/setup hook: overrides a node's stock, clipped to valid range.
    pub fn set_stock(&mut self, node: usize, value: f32) {
        self.stock[node] = value.clamp(0.0, self.max_stock);
    }

    /// Batched harvest: every agent within the contact radius of a node
    /// harvests `base_amount` plus zero-mean Gaussian noise from its closest
    /// in-range node. Amounts are clipped non-negative and to the node's
    /// remaining stock, so stock never goes below zero. A node at zero stock
    /// stays harvestable and yields zero.
    ///
    /// The noise standard deviation widens up to 3× as a node depletes,
    /// making scarce nodes less predictable.
    pub fn harvest<R: Rng>(
        &mut self,
        positions: &[(f32, f32)],
        base_amount: f32,
        rng: &mut R,
    ) -> Vec<f32> {
        let mut harvested = vec![0.0f32; positions.len()];
        if self.xs.is_empty() {
            return harvested;
        }
        let radius_sq = self.contact_radius * self.contact_radius;

        for (i, &(ax, ay)) in positions.iter().enumerate() {
            // Closest in-radius node; the node set is small and fixed, so the
            // inner scan is the broadcast dimension.
            let mut best = usize::MAX;
            let mut best_sq = radius_sq;
            for n in 0..self.xs.len() {
                let dx = ax - self.xs[n];
                let dy = ay - self.ys[n];
                let d_sq = dx * dx + dy * dy;
                if d_sq < best_sq {
                    best_sq = d_sq;
                    best = n;
                }
            }
            if best == usize::MAX {
                continue;
            }

            let depletion = 1.0 - self.stock[best] / self.max_stock;
            let std = self.harvest_noise_std * (1.0 + depletion * 2.0);
            let noise = if std > 0.0 {
                // std is always finite and positive here.
                Normal::new(0.0f32, std)
                    .map(|n| n.sample(rng))
                    .unwrap_or(0.0)
            } else {
                0.0
            };
            let amount = (base_amount + noise).max(0.0).min(self.stock[best]);
            self.stock[best] -= amount;
            debug_assert!(self.stock[best] >= 0.0, "node stock went negative");
            harvested[i] = amount;
        }
        harvested
    }

    /// Regenerates every node toward `max_stock`, clipped at the ceiling.
    pub fn update(&mut self, dt: f32) {
        let gain = self.regen_rate * dt;
        for stock in &mut self.stock {
            *stock = (*stock + gain).clamp(0.0, self.max_stock);
        }
    }

    /// Read-only export for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ResourceNodeSnapshot> {
        (0..self.xs.len())
            .map(|n| ResourceNodeSnapshot {
                x: self.xs[n],
                y: self.ys[n],
                stock_fraction: self.stock[n] / self.max_stock,
                active: self.stock[n] > 0.0,
            })
            .collect()
    }
}
