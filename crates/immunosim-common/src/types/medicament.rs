//! Medicament - an administered medication as seen by a host
//!
//! The engine never administers anything itself. It only reads two things:
//! - `id`: keys the concentration maps handed to pathogens
//! - `h`: per-step retention factor used by dose decay (`D' = h * D`)

use serde::{Deserialize, Serialize};

use super::ids::MedicamentId;
use crate::error::EntityError;
use crate::{MAX_DECAY_CONSTANT, MIN_DECAY_CONSTANT};

/// Medication record
///
/// Deserialisation goes through [`Medicament::new`], so a record read from
/// JSON carries a valid decay constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMedicament")]
pub struct Medicament {
    /// Medication identity
    pub id: MedicamentId,

    /// Retention factor in [0, 1]. 0 clears instantly, 1 never decays.
    h: f64,
}

/// Unvalidated wire form of [`Medicament`]
#[derive(Deserialize)]
struct RawMedicament {
    id: String,
    h: f64,
}

impl TryFrom<RawMedicament> for Medicament {
    type Error = EntityError;

    fn try_from(raw: RawMedicament) -> Result<Self, Self::Error> {
        Medicament::new(raw.id, raw.h)
    }
}

impl Medicament {
    /// Create a medication, validating the decay constant
    pub fn new(id: impl Into<String>, h: f64) -> Result<Self, EntityError> {
        let id = MedicamentId::new(id)?;
        if !(MIN_DECAY_CONSTANT..=MAX_DECAY_CONSTANT).contains(&h) {
            return Err(EntityError::InvalidArgument(format!(
                "decay constant for {} must lie in [0, 1], got {}",
                id, h
            )));
        }
        Ok(Self { id, h })
    }

    /// Build from a half-life expressed in timesteps: `h = 0.5^(1 / half_life)`
    pub fn from_half_life(id: impl Into<String>, half_life_steps: f64) -> Result<Self, EntityError> {
        if !(half_life_steps.is_finite() && half_life_steps > 0.0) {
            return Err(EntityError::InvalidArgument(format!(
                "half-life must be positive, got {}",
                half_life_steps
            )));
        }
        Self::new(id, 0.5_f64.powf(1.0 / half_life_steps))
    }

    /// Retention factor in [0, 1]
    #[inline]
    pub fn h(&self) -> f64 {
        self.h
    }

    /// Concentration remaining after one step of decay
    #[inline]
    pub fn decay(&self, concentration: f64) -> f64 {
        crate::clamp_non_negative(self.h * concentration)
    }
}

impl std::fmt::Display for Medicament {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Medicament({}, h={:.3})", self.id, self.h)
    }
}
