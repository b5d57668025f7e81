//! # Apiary Core
//!
//! A real-time agent-swarm simulation engine. Tens of thousands of colony
//! members advance at a fixed 30 Hz logical tick under a strict per-tick
//! compute budget, decoupled from whatever loop is rendering them.
//!
//! The population is split across three fidelity tiers with hysteretic
//! level-of-detail control, steered by a decaying pheromone field and a
//! small foraging economy:
//!
//! - [`field::PheromoneField`]: decaying, diffusing scalar grid with cached
//!   Sobel gradients and clamped O(1) sampling.
//! - [`resources::ResourceSet`]: fixed resource nodes with bounded stock,
//!   stochastic harvest, and regeneration.
//! - [`caste::CasteTable`]: branchless per-caste behavior biasing.
//! - [`pool::TieredAgentPool`]: structure-of-arrays tiers updated by the
//!   kernels in [`kernels`].
//! - [`lod::LodController`]: distance-from-focus tier assignment with
//!   asymmetric promote/demote hysteresis.
//! - [`engine::Engine`]: fixed-step orchestration, budget classification,
//!   and copy-on-publish snapshot export.
//!
//! ## Example
//!
//! ```no_run
//! use apiary_core::config::SimConfig;
//! use apiary_core::engine::Engine;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = SimConfig::default();
//! config.world.seed = Some(42);
//! let mut engine = Engine::new(config)?;
//!
//! // Drive from any render loop; ticks run at a fixed 30 Hz regardless.
//! engine.advance(0.016)?;
//! let snapshot = engine.snapshot();
//! println!("tick {}: {} agents", snapshot.tick, snapshot.total_agents());
//! # Ok(())
//! # }
//! ```

pub mod caste;
pub mod coherence;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod kernels;
pub mod lod;
pub mod metrics;
pub mod pool;
pub mod resources;
pub mod scheduler;
pub mod snapshot;

pub use config::SimConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use scheduler::{BudgetStatus, DegradationSignal};
pub use snapshot::WorldSnapshot;
