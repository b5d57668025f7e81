//! Pheromone field: a decaying, diffusing 2-D scalar grid with cached
//! gradients.
//!
//! The field is owned exclusively by the engine and mutated only through
//! [`PheromoneField::deposit`] and [`PheromoneField::update`]. Gradients are
//! recomputed once per tick and cached, so per-agent sampling is an O(1)
//! table lookup. Sampled vectors are clamped to a maximum magnitude: the
//! field may influence steering, never dictate it.

use crate::config::FieldConfig;
use serde::{Deserialize, Serialize};

/// Decaying scalar grid mapped over world space, with cached Sobel gradients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PheromoneField {
    resolution: usize,
    cells: Vec<f32>,
    #[serde(skip)]
    scratch: Vec<f32>,
    #[serde(skip)]
    grad_x: Vec<f32>,
    #[serde(skip)]
    grad_y: Vec<f32>,
    decay_factor: f32,
    ceiling: f32,
    gradient_clamp: f32,
    cell_per_world_x: f32,
    cell_per_world_y: f32,
}

impl PheromoneField {
    pub fn new(cfg: &FieldConfig, world_width: f32, world_height: f32) -> Self {
        let n = cfg.resolution * cfg.resolution;
        Self {
            resolution: cfg.resolution,
            cells: vec![0.0; n],
            scratch: vec![0.0; n],
            grad_x: vec![0.0; n],
            grad_y: vec![0.0; n],
            decay_factor: cfg.decay_factor,
            ceiling: cfg.ceiling,
            gradient_clamp: cfg.gradient_clamp,
            cell_per_world_x: cfg.resolution as f32 / world_width,
            cell_per_world_y: cfg.resolution as f32 / world_height,
        }
    }

    #[must_use]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Maps a world position to its containing cell, clamping out-of-bounds
    /// positions to the nearest valid cell.
    #[inline]
    fn cell_index(&self, x: f32, y: f32) -> usize {
        let max = (self.resolution - 1) as f32;
        let cx = (x * self.cell_per_world_x).clamp(0.0, max) as usize;
        let cy = (y * self.cell_per_world_y).clamp(0.0, max) as usize;
        cy * self.resolution + cx
    }

    /// Adds a constant-amplitude pulse to the cell containing each position.
    /// Out-of-bounds positions are clamped, never an error. Cells saturate
    /// at the configured ceiling.
    pub fn deposit(&mut self, positions: &[(f32, f32)], amplitude: f32) {
        for &(x, y) in positions {
            let idx = self.cell_index(x, y);
            self.cells[idx] = (self.cells[idx] + amplitude).min(self.ceiling);
        }
    }

    /// Per-tick field evolution: exponential decay, 3×3 Gaussian diffusion,
    /// then gradient recomputation. Ordering matters: decay before diffusion
    /// keeps the field bounded, and gradients are derived from the already
    /// smoothed grid so fresh pulses cannot explode the steering vectors.
    pub fn update(&mut self) {
        for cell in &mut self.cells {
            *cell = (*cell * self.decay_factor).clamp(0.0, self.ceiling);
        }
        self.diffuse();
        self.compute_gradients();
    }

    /// 3×3 Gaussian blur (1-2-1 kernel, reflecting boundaries) into the
    /// scratch buffer, then swap. The kernel sums to one, so total field
    /// mass is preserved.
    fn diffuse(&mut self) {
        let n = self.resolution;
        for y in 0..n {
            for x in 0..n {
                let mut acc = 0.0f32;
                for ky in -1i32..=1 {
                    for kx in -1i32..=1 {
                        let ny = reflect(y as i32 + ky, n);
                        let nx = reflect(x as i32 + kx, n);
                        let w = GAUSS[(ky + 1) as usize][(kx + 1) as usize];
                        acc += self.cells[ny * n + nx] * w;
                    }
                }
                self.scratch[y * n + x] = acc;
            }
        }
        std::mem::swap(&mut self.cells, &mut self.scratch);
    }

    /// Recomputes the cached ∂x/∂y grids with Sobel operators and reflecting
    /// boundaries.
    fn compute_gradients(&mut self) {
        let n = self.resolution;
        for y in 0..n {
            for x in 0..n {
                let mut gx = 0.0f32;
                let mut gy = 0.0f32;
                for ky in -1i32..=1 {
                    for kx in -1i32..=1 {
                        let ny = reflect(y as i32 + ky, n);
                        let nx = reflect(x as i32 + kx, n);
                        let v = self.cells[ny * n + nx];
                        gx += v * SOBEL_X[(ky + 1) as usize][(kx + 1) as usize];
                        gy += v * SOBEL_Y[(ky + 1) as usize][(kx + 1) as usize];
                    }
                }
                self.grad_x[y * n + x] = gx;
                self.grad_y[y * n + x] = gy;
            }
        }
    }

    /// Nearest-cell lookup into the cached gradient grids. Each vector is
    /// clamped to the configured maximum magnitude before being returned.
    pub fn sample_gradient_into(&self, positions: &[(f32, f32)], out: &mut Vec<(f32, f32)>) {
        out.clear();
        out.reserve(positions.len());
        let clamp_sq = self.gradient_clamp * self.gradient_clamp;
        for &(x, y) in positions {
            let idx = self.cell_index(x, y);
            let mut gx = self.grad_x[idx];
            let mut gy = self.grad_y[idx];
            let mag_sq = gx * gx + gy * gy;
            if mag_sq > clamp_sq {
                let scale = self.gradient_clamp / mag_sq.sqrt();
                gx *= scale;
                gy *= scale;
            }
            out.push((gx, gy));
        }
    }

    /// Convenience allocation form of [`Self::sample_gradient_into`].
    #[must_use]
    pub fn sample_gradient(&self, positions: &[(f32, f32)]) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        self.sample_gradient_into(positions, &mut out);
        out
    }

    /// Intensity at the cell containing a world position.
    #[must_use]
    pub fn intensity_at(&self, x: f32, y: f32) -> f32 {
        self.cells[self.cell_index(x, y)]
    }

    #[must_use]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Heatmap-ready copy of the grid normalized by the ceiling into [0, 1].
    #[must_use]
    pub fn heatmap(&self) -> Vec<f32> {
        self.cells.iter().map(|&v| v / self.ceiling).collect()
    }

    /// Total field mass, useful for conservation checks.
    #[must_use]
    pub fn total_intensity(&self) -> f32 {
        self.cells.iter().sum()
    }

    /// Largest cell intensity.
    #[must_use]
    pub fn peak_intensity(&self) -> f32 {
        self.cells.iter().fold(0.0f32, |a, &b| a.max(b))
    }
}

const GAUSS: [[f32; 3]; 3] = [
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
    [2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0],
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
];

const SOBEL_X: [[f32; 3]; 3] = [
    [-1.0, 0.0, 1.0],
    [-2.0, 0.0, 2.0],
    [-1.0, 0.0, 1.0],
];

const SOBEL_Y: [[f32; 3]; 3] = [
    [-1.0, -2.0, -1.0],
    [0.0, 0.0, 0.0],
    [1.0, 2.0, 1.0],
];

/// Reflecting boundary index for the 3×3 kernels.
#[inline]
fn reflect(i: i32, n: usize) -> usize {
    let n = n as i32;
    let r = if i < 0 {
        -i
    } else if i >= n {
        2 * n - i - 2
    } else {
        i
    };
    r.clamp(0, n - 1) as usize
}
