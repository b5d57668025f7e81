//! Per-tier update kernels.
//!
//! All three kernels share the same shape: accumulate steering into velocity,
//! damp, clamp speed through the caste bias table, integrate, clamp to the
//! world. They differ only in which steering terms exist, so the cost per
//! agent drops with the tier's fidelity. Caste coefficients are gathered by
//! id through [`CasteTable::bias_by_id`]; there is no per-agent branch on
//! caste in any pass.

use crate::caste::CasteTable;
use crate::config::{MovementConfig, WorldConfig};
use crate::field::PheromoneField;
use crate::pool::{flags, TierArrays};
use rand::Rng;
use rand_distr::StandardNormal;

/// Read-only inputs shared by every kernel invocation in a tick.
pub struct KernelCtx<'a> {
    pub movement: &'a MovementConfig,
    pub world: &'a WorldConfig,
    pub castes: &'a CasteTable,
    /// Fixed timestep in seconds.
    pub dt: f32,
}

/// Full-fidelity kernel: pheromone steering, colony cohesion, per-agent
/// Gaussian jitter, maturity advance.
pub fn detailed_kernel<R: Rng>(
    arr: &mut TierArrays,
    field: &PheromoneField,
    ctx: &KernelCtx,
    rng: &mut R,
    positions: &mut Vec<(f32, f32)>,
    gradients: &mut Vec<(f32, f32)>,
) {
    gather_positions(arr, positions);
    field.sample_gradient_into(positions, gradients);

    let mv = ctx.movement;
    for i in 0..arr.len() {
        let bias = ctx.castes.bias_by_id(arr.caste[i]);
        let (gx, gy) = gradients[i];

        // Cohesion pulls toward the colony center, unit direction.
        let dx = ctx.world.colony_x - arr.px[i];
        let dy = ctx.world.colony_y - arr.py[i];
        let dist = (dx * dx + dy * dy).sqrt().max(1e-6);
        let coh = mv.cohesion_weight * bias.cohesion_mult;

        let jitter_std = mv.jitter_base * bias.noise_amp;
        let jx: f32 = rng.sample(StandardNormal);
        let jy: f32 = rng.sample(StandardNormal);

        arr.vx[i] += gx * bias.gradient_weight + dx / dist * coh + jx * jitter_std;
        arr.vy[i] += gy * bias.gradient_weight + dy / dist * coh + jy * jitter_std;
    }

    finish_motion(arr, ctx);
    advance_maturity(arr, ctx);
}

/// Mid-fidelity kernel: pheromone steering plus proxy alignment toward the
/// detailed tier's mean velocity, with jitter. No cohesion term.
pub fn batched_kernel<R: Rng>(
    arr: &mut TierArrays,
    field: &PheromoneField,
    detailed_mean_velocity: (f32, f32),
    ctx: &KernelCtx,
    rng: &mut R,
    positions: &mut Vec<(f32, f32)>,
    gradients: &mut Vec<(f32, f32)>,
) {
    gather_positions(arr, positions);
    field.sample_gradient_into(positions, gradients);

    let mv = ctx.movement;
    let (mvx, mvy) = detailed_mean_velocity;
    let proxy = mv.proxy_alignment_weight;
    for i in 0..arr.len() {
        let bias = ctx.castes.bias_by_id(arr.caste[i]);
        let (gx, gy) = gradients[i];

        let jitter_std = mv.jitter_base * bias.noise_amp;
        let jx: f32 = rng.sample(StandardNormal);
        let jy: f32 = rng.sample(StandardNormal);

        arr.vx[i] += gx * bias.gradient_weight + (mvx - arr.vx[i]) * proxy + jx * jitter_std;
        arr.vy[i] += gy * bias.gradient_weight + (mvy - arr.vy[i]) * proxy + jy * jitter_std;
    }

    finish_motion(arr, ctx);
    advance_maturity(arr, ctx);
}

/// Background kernel: gradient drift only. No jitter, no harvest, no deposit.
pub fn statistical_kernel(
    arr: &mut TierArrays,
    field: &PheromoneField,
    ctx: &KernelCtx,
    positions: &mut Vec<(f32, f32)>,
    gradients: &mut Vec<(f32, f32)>,
) {
    gather_positions(arr, positions);
    field.sample_gradient_into(positions, gradients);

    for i in 0..arr.len() {
        let bias = ctx.castes.bias_by_id(arr.caste[i]);
        let (gx, gy) = gradients[i];
        arr.vx[i] += gx * bias.gradient_weight;
        arr.vy[i] += gy * bias.gradient_weight;
    }

    finish_motion(arr, ctx);
    advance_maturity(arr, ctx);
}

fn gather_positions(arr: &TierArrays, out: &mut Vec<(f32, f32)>) {
    out.clear();
    out.extend(arr.px.iter().zip(&arr.py).map(|(&x, &y)| (x, y)));
}

/// Damping, caste-scaled speed clamp, position integration, world clamp.
/// The clamp runs after every velocity-modifying term, so the speed bound
/// holds at the end of the kernel regardless of jitter draws.
fn finish_motion(arr: &mut TierArrays, ctx: &KernelCtx) {
    let mv = ctx.movement;
    let dt = ctx.dt;
    for i in 0..arr.len() {
        let bias = ctx.castes.bias_by_id(arr.caste[i]);
        arr.vx[i] *= mv.damping;
        arr.vy[i] *= mv.damping;

        let limit = mv.max_speed * bias.speed_mult;
        let speed_sq = arr.vx[i] * arr.vx[i] + arr.vy[i] * arr.vy[i];
        if speed_sq > limit * limit {
            let scale = limit / speed_sq.sqrt();
            arr.vx[i] *= scale;
            arr.vy[i] *= scale;
        }
        debug_assert!(
            arr.vx[i] * arr.vx[i] + arr.vy[i] * arr.vy[i] <= limit * limit * 1.0001,
            "speed bound violated"
        );

        arr.px[i] = (arr.px[i] + arr.vx[i] * dt).clamp(0.0, ctx.world.width);
        arr.py[i] = (arr.py[i] + arr.vy[i] * dt).clamp(0.0, ctx.world.height);
    }
}

/// Maturity advances monotonically and clamps at 1.0. Agents past 0.9 carry
/// the foreshadow flag so the presentation layer can fade them early.
fn advance_maturity(arr: &mut TierArrays, ctx: &KernelCtx) {
    let gain = ctx.movement.maturity_rate * ctx.dt;
    for i in 0..arr.len() {
        arr.maturity[i] = (arr.maturity[i] + gain).min(1.0);
        if arr.maturity[i] > 0.9 {
            arr.flags[i] |= flags::FORESHADOW_DEATH;
        }
    }
}

/// Foraging state flips, applied after harvesting. A successful harvest
/// switches the agent to returning; reaching the colony while returning
/// switches it back to seeking.
pub fn update_forage_state(
    arr: &mut TierArrays,
    harvested: &[f32],
    colony_x: f32,
    colony_y: f32,
    colony_radius: f32,
) {
    let radius_sq = colony_radius * colony_radius;
    for i in 0..arr.len() {
        if harvested[i] > 0.0 {
            arr.flags[i] = (arr.flags[i] & !flags::SEEKING_FOOD) | flags::RETURNING;
            continue;
        }
        if arr.flags[i] & flags::RETURNING != 0 {
            let dx = arr.px[i] - colony_x;
            let dy = arr.py[i] - colony_y;
            if dx * dx + dy * dy <= radius_sq {
                arr.flags[i] = (arr.flags[i] & !flags::RETURNING) | flags::SEEKING_FOOD;
            }
        }
    }
}

/// Positions of agents carrying any of the given flag bits.
#[must_use]
pub fn positions_with_flags(arr: &TierArrays, mask: u32) -> Vec<(f32, f32)> {
    (0..arr.len())
        .filter(|&i| arr.flags[i] & mask != 0)
        .map(|i| (arr.px[i], arr.py[i]))
        .collect()
}
