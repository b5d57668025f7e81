//! Caste model: a stateless lookup from caste id to behavioral bias
//! coefficients.
//!
//! The table is indexed by the per-agent caste byte so mixed-caste
//! populations update in a single gather pass with no per-agent branching.
//! Caste ids are validated once at spawn time and never afterwards.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Behavioral role assigned at spawn, immutable for the agent's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Caste {
    Scout = 0,
    Forager = 1,
    Nurse = 2,
}

pub const CASTE_COUNT: usize = 3;

impl Caste {
    /// Validates a raw caste id. Fails fast with [`EngineError::InvalidCaste`];
    /// steady-state code paths never call this.
    pub fn from_id(id: u8) -> Result<Self, EngineError> {
        match id {
            0 => Ok(Caste::Scout),
            1 => Ok(Caste::Forager),
            2 => Ok(Caste::Nurse),
            _ => Err(EngineError::InvalidCaste { id }),
        }
    }
}

/// Scalar bias coefficients applied by the tier update kernels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CasteBias {
    /// Weight of the pheromone gradient in the steering sum.
    pub gradient_weight: f32,
    /// Multiplier on the global max speed bound.
    pub speed_mult: f32,
    /// Multiplier on the base steering jitter amplitude.
    pub noise_amp: f32,
    /// Multiplier on the colony-cohesion pull.
    pub cohesion_mult: f32,
}

/// Fixed bias table. Scouts range fast and erratically and barely follow
/// trails; foragers follow trails at nominal speed; nurses hug the colony.
#[derive(Debug, Clone)]
pub struct CasteTable {
    biases: [CasteBias; CASTE_COUNT],
}

impl Default for CasteTable {
    fn default() -> Self {
        Self {
            biases: [
                // Scout
                CasteBias {
                    gradient_weight: 0.15,
                    speed_mult: 1.3,
                    noise_amp: 1.5,
                    cohesion_mult: 1.0,
                },
                // Forager
                CasteBias {
                    gradient_weight: 0.3,
                    speed_mult: 1.0,
                    noise_amp: 1.0,
                    cohesion_mult: 1.0,
                },
                // Nurse
                CasteBias {
                    gradient_weight: 0.1,
                    speed_mult: 0.8,
                    noise_amp: 0.6,
                    cohesion_mult: 2.0,
                },
            ],
        }
    }
}

impl CasteTable {
    #[must_use]
    pub fn bias(&self, caste: Caste) -> CasteBias {
        self.biases[caste as usize]
    }

    /// Unchecked gather for hot loops. The id must have passed
    /// [`Caste::from_id`] at spawn; debug builds assert the invariant.
    #[inline]
    #[must_use]
    pub fn bias_by_id(&self, id: u8) -> CasteBias {
        debug_assert!((id as usize) < CASTE_COUNT, "unvalidated caste id {id}");
        self.biases[(id as usize).min(CASTE_COUNT - 1)]
    }
}

/// Spawn-time caste distribution: 10% scouts, 60% foragers, 30% nurses.
pub const SCOUT_FRACTION: f32 = 0.10;
pub const FORAGER_FRACTION: f32 = 0.60;

/// Builds a shuffled caste assignment for `count` agents following the
/// spawn distribution.
pub fn assign_castes<R: rand::Rng>(count: usize, rng: &mut R) -> Vec<u8> {
    use rand::seq::SliceRandom;

    let scouts = (count as f32 * SCOUT_FRACTION) as usize;
    let foragers = (count as f32 * FORAGER_FRACTION) as usize;

    let mut castes = Vec::with_capacity(count);
    castes.resize(scouts, Caste::Scout as u8);
    castes.resize(scouts + foragers, Caste::Forager as u8);
    castes.resize(count, Caste::Nurse as u8);
    castes.shuffle(rng);
    castes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_valid_caste_ids_round_trip() {
        for id in 0..3u8 {
            let caste = Caste::from_id(id).unwrap();
            assert_eq!(caste as u8, id);
        }
    }

    #[test]
    fn test_invalid_caste_id_rejected() {
        assert_eq!(
            Caste::from_id(7),
            Err(EngineError::InvalidCaste { id: 7 })
        );
    }

    #[test]
    fn test_nurse_cohesion_dominates() {
        let table = CasteTable::default();
        let nurse = table.bias(Caste::Nurse);
        let forager = table.bias(Caste::Forager);
        assert!(nurse.cohesion_mult > forager.cohesion_mult);
        assert!(nurse.speed_mult < forager.speed_mult);
    }

    #[test]
    fn test_assign_castes_distribution() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let castes = assign_castes(1000, &mut rng);
        assert_eq!(castes.len(), 1000);
        let scouts = castes.iter().filter(|&&c| c == Caste::Scout as u8).count();
        let foragers = castes.iter().filter(|&&c| c == Caste::Forager as u8).count();
        let nurses = castes.iter().filter(|&&c| c == Caste::Nurse as u8).count();
        assert_eq!(scouts, 100);
        assert_eq!(foragers, 600);
        assert_eq!(nurses, 300);
        // Every id must be valid at spawn.
        for &c in &castes {
            assert!(Caste::from_id(c).is_ok());
        }
    }
}
