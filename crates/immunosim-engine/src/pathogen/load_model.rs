//! Load update law: L' = L * (1 + r - drug_pressure - immune_pressure)
//!
//! ```text
//! efficacy(m)     = clamp(sensitivity[m] - resistance[m], 0, 1)
//! drug_pressure   = drug_weight * alpha * Σ concentration[m] * efficacy(m)
//! immune_pressure = immune_weight * immune_reactivity * I
//! ```
//!
//! The per-pathogen coefficients are data on [`Pathogene`]; the weights here
//! are the run-wide knobs and can be tuned without touching any pathogen.

use std::collections::HashMap;

use immunosim_common::{clamp_non_negative, EntityError, MedicamentId};
use serde::{Deserialize, Serialize};

use super::Pathogene;

/// Run-wide parameters of the load update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadModel {
    /// Scale applied to the summed medication suppression
    pub drug_weight: f64,
    /// Scale applied to the immune suppression term
    pub immune_weight: f64,
    /// Optional carrying capacity; loads above it are capped
    pub max_load: Option<f64>,
}

impl Default for LoadModel {
    fn default() -> Self {
        Self {
            drug_weight: 1.0,
            immune_weight: 1.0,
            max_load: None,
        }
    }
}

impl LoadModel {
    /// Create a model, rejecting negative or non-finite weights
    pub fn new(drug_weight: f64, immune_weight: f64, max_load: Option<f64>) -> Result<Self, EntityError> {
        for (name, value) in [("drug_weight", drug_weight), ("immune_weight", immune_weight)] {
            EntityError::require_finite(name, value)?;
            if value < 0.0 {
                return Err(EntityError::InvalidArgument(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if let Some(cap) = max_load {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(EntityError::InvalidArgument(format!(
                    "max_load must be positive, got {}",
                    cap
                )));
            }
        }
        Ok(Self {
            drug_weight,
            immune_weight,
            max_load,
        })
    }

    /// Suppression contributed by one medication per unit of concentration
    #[inline]
    pub fn efficacy(resistance: f64, sensitivity: f64) -> f64 {
        (sensitivity - resistance).clamp(0.0, 1.0)
    }

    /// Total medication pressure on a pathogen.
    ///
    /// Walks every medication the pathogen has a coefficient for; a medication
    /// missing from `concentrations` has not been administered and counts as 0.
    pub fn drug_pressure(&self, pathogene: &Pathogene, concentrations: &HashMap<MedicamentId, f64>) -> f64 {
        let weighted: f64 = pathogene
            .medications()
            .map(|med| {
                let concentration = concentrations
                    .get(med)
                    .copied()
                    .map(clamp_non_negative)
                    .unwrap_or(0.0);
                concentration
                    * Self::efficacy(pathogene.resistance_to(med), pathogene.sensitivity_to(med))
            })
            .sum();

        self.drug_weight * pathogene.alpha * weighted
    }

    /// Immune pressure exerted by a response of size `immune_response`
    #[inline]
    pub fn immune_pressure(&self, pathogene: &Pathogene, immune_response: f64) -> f64 {
        self.immune_weight * pathogene.immune_reactivity * clamp_non_negative(immune_response)
    }

    /// Next-step load. Pure; the pathogen itself is not modified.
    ///
    /// Always finite: overflow saturates at `f64::MAX` before the cap applies.
    pub fn next_load(
        &self,
        pathogene: &Pathogene,
        concentrations: &HashMap<MedicamentId, f64>,
        immune_response: f64,
    ) -> f64 {
        let factor = 1.0 + pathogene.growth_rate
            - self.drug_pressure(pathogene, concentrations)
            - self.immune_pressure(pathogene, immune_response);

        let next = clamp_non_negative(pathogene.load() * factor);
        match self.max_load {
            Some(cap) => next.min(cap),
            None => next,
        }
    }
}
