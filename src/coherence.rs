//! Swarm coherence: over-alignment detection with dissent injection, and a
//! periodically sampled coherence index.
//!
//! Perfectly synchronized motion reads as mechanical, so buckets of agents
//! whose mean velocity saturates get a fraction of their members' headings
//! rotated by a bounded random angle. The bucket grid is coarse and rebuilt
//! each pass, keeping the cost amortized O(1) per agent.

use crate::config::CoherenceConfig;
use crate::pool::TierArrays;
use rand::Rng;

const DISSENT_MAX_ANGLE: f32 = std::f32::consts::PI / 6.0;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sum_vx: f32,
    sum_vy: f32,
    count: u32,
}

/// Coarse velocity-alignment grid over the interactive tiers.
#[derive(Debug)]
pub struct CoherenceGrid {
    cells: usize,
    buckets: Vec<Bucket>,
    over_aligned: Vec<bool>,
    cell_per_world_x: f32,
    cell_per_world_y: f32,
    alignment_threshold: f32,
    dissent_fraction: f32,
    min_population: u32,
}

impl CoherenceGrid {
    pub fn new(cfg: &CoherenceConfig, world_width: f32, world_height: f32) -> Self {
        let n = cfg.bucket_cells * cfg.bucket_cells;
        Self {
            cells: cfg.bucket_cells,
            buckets: vec![Bucket::default(); n],
            over_aligned: vec![false; n],
            cell_per_world_x: cfg.bucket_cells as f32 / world_width,
            cell_per_world_y: cfg.bucket_cells as f32 / world_height,
            alignment_threshold: cfg.alignment_threshold,
            dissent_fraction: cfg.dissent_fraction,
            min_population: cfg.min_bucket_population as u32,
        }
    }

    #[inline]
    fn bucket_index(&self, x: f32, y: f32) -> usize {
        let max = (self.cells - 1) as f32;
        let cx = (x * self.cell_per_world_x).clamp(0.0, max) as usize;
        let cy = (y * self.cell_per_world_y).clamp(0.0, max) as usize;
        cy * self.cells + cx
    }

    /// Two-pass dissent injection over the given tiers: accumulate per-bucket
    /// mean velocities, mark buckets whose mean speed exceeds the alignment
    /// threshold, then rotate a random fraction of each marked bucket's
    /// members by up to ±30 degrees. Returns how many agents were perturbed.
    pub fn apply_dissent<R: Rng>(
        &mut self,
        tiers: &mut [&mut TierArrays],
        max_speed: f32,
        rng: &mut R,
    ) -> usize {
        for b in &mut self.buckets {
            *b = Bucket::default();
        }
        for arr in tiers.iter() {
            for i in 0..arr.len() {
                let b = self.bucket_index(arr.px[i], arr.py[i]);
                self.buckets[b].sum_vx += arr.vx[i];
                self.buckets[b].sum_vy += arr.vy[i];
                self.buckets[b].count += 1;
            }
        }

        let speed_limit = self.alignment_threshold * max_speed;
        for (b, bucket) in self.buckets.iter().enumerate() {
            self.over_aligned[b] = if bucket.count >= self.min_population {
                let n = bucket.count as f32;
                let mx = bucket.sum_vx / n;
                let my = bucket.sum_vy / n;
                (mx * mx + my * my).sqrt() > speed_limit
            } else {
                false
            };
        }

        let mut perturbed = 0;
        for arr in tiers.iter_mut() {
            for i in 0..arr.len() {
                let b = self.bucket_index(arr.px[i], arr.py[i]);
                if !self.over_aligned[b] {
                    continue;
                }
                if rng.gen::<f32>() >= self.dissent_fraction {
                    continue;
                }
                let angle = rng.gen_range(-DISSENT_MAX_ANGLE..=DISSENT_MAX_ANGLE);
                let (sin, cos) = angle.sin_cos();
                let vx = arr.vx[i];
                let vy = arr.vy[i];
                arr.vx[i] = vx * cos - vy * sin;
                arr.vy[i] = vx * sin + vy * cos;
                perturbed += 1;
            }
        }
        perturbed
    }
}

/// Alignment of the swarm's motion across the given tiers, in [0, 1]:
/// the magnitude of the mean velocity over the mean individual speed. Fast
/// movers weigh more than crawlers; 1 means all momentum points one way,
/// near 0 means it cancels out.
#[must_use]
pub fn coherence_index(tiers: &[&TierArrays]) -> f32 {
    let mut sum_vx = 0.0f32;
    let mut sum_vy = 0.0f32;
    let mut sum_speed = 0.0f32;
    for arr in tiers {
        for i in 0..arr.len() {
            sum_vx += arr.vx[i];
            sum_vy += arr.vy[i];
            sum_speed += (arr.vx[i] * arr.vx[i] + arr.vy[i] * arr.vy[i]).sqrt();
        }
    }
    if sum_speed < 1e-6 {
        return 0.0;
    }
    (sum_vx * sum_vx + sum_vy * sum_vy).sqrt() / sum_speed
}

/// Samples the coherence index at a fixed interval and holds the last value
/// between samples.
#[derive(Debug)]
pub struct CoherenceMonitor {
    interval: f32,
    elapsed: f32,
    last_index: f32,
}

impl CoherenceMonitor {
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            // Primed so the first tick samples immediately.
            elapsed: interval,
            last_index: 0.0,
        }
    }

    /// Advances the sample timer; recomputes the index when it expires.
    pub fn advance(&mut self, dt: f32, tiers: &[&TierArrays]) -> f32 {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            self.last_index = coherence_index(tiers);
        }
        self.last_index
    }

    #[must_use]
    pub fn last_index(&self) -> f32 {
        self.last_index
    }
}
