//! Typed errors for population setup and tier management.

use crate::pool::Tier;
use thiserror::Error;

/// Hard errors raised by the engine.
///
/// Configuration problems are reported through `anyhow` at startup (see
/// [`crate::config::SimConfig::validate`]); this enum covers the few failures
/// that carry structured data and can surface after construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A caste id outside the known set was supplied at spawn time.
    #[error("invalid caste id {id} (expected 0..=2)")]
    InvalidCaste { id: u8 },

    /// A tier transfer would exceed the tier's configured capacity.
    /// Agents are never silently dropped; the tick that caused this fails.
    #[error("tier {tier:?} is at capacity ({capacity})")]
    TierCapacity { tier: Tier, capacity: usize },
}
