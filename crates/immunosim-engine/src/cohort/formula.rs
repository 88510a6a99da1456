//! Immune-response formulas per age cohort
//!
//! | Cohort  | I(t+1)                                   |
//! |---------|------------------------------------------|
//! | Young   | `I + beta * sqrt(L) - fatigue * I`       |
//! | Adult   | `I + beta * L - fatigue * I`             |
//! | Elderly | `I + beta * L - fatigue * I^2`           |
//!
//! `L` is floored at 0 before use and the result is clamped to
//! `[0, f64::MAX]` for every cohort.

use std::str::FromStr;

use immunosim_common::{clamp_non_negative, ConfigError, EntityError};
use serde::{Deserialize, Serialize};

/// Per-patient coefficients shared by every cohort formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImmuneParams {
    /// Stimulation coefficient
    pub beta: f64,
    /// Fatigue coefficient
    pub fatigue_coeff: f64,
}

impl ImmuneParams {
    pub fn new(beta: f64, fatigue_coeff: f64) -> Result<Self, EntityError> {
        EntityError::require_finite("beta", beta)?;
        EntityError::require_finite("fatigue_coeff", fatigue_coeff)?;
        Ok(Self {
            beta,
            fatigue_coeff,
        })
    }
}

/// Age cohort of a patient. Fixed for the patient's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// Square-root stimulation: immature, dampened response
    Young,
    /// Linear stimulation, linear fatigue
    #[serde(alias = "adult_simple")]
    Adult,
    /// Linear stimulation, quadratic fatigue
    Elderly,
}

impl Cohort {
    pub const ALL: [Cohort; 3] = [Cohort::Young, Cohort::Adult, Cohort::Elderly];

    /// Stimulation produced by a load
    #[inline]
    fn stimulation(self, params: &ImmuneParams, load: f64) -> f64 {
        match self {
            Cohort::Young => params.beta * load.sqrt(),
            Cohort::Adult | Cohort::Elderly => params.beta * load,
        }
    }

    /// Fatigue subtracted from the current response
    #[inline]
    fn fatigue(self, params: &ImmuneParams, response: f64) -> f64 {
        match self {
            Cohort::Young | Cohort::Adult => params.fatigue_coeff * response,
            Cohort::Elderly => params.fatigue_coeff * response * response,
        }
    }

    /// Next immune response given the next load and the current response
    pub fn next_response(self, params: &ImmuneParams, next_load: f64, current: f64) -> f64 {
        let load = clamp_non_negative(next_load);
        // Saturate each side first so a huge response never becomes inf - inf.
        let stimulated = (current + self.stimulation(params, load)).min(f64::MAX);
        let fatigue = self.fatigue(params, current).min(f64::MAX);
        clamp_non_negative(stimulated - fatigue)
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cohort::Young => write!(f, "young"),
            Cohort::Adult => write!(f, "adult"),
            Cohort::Elderly => write!(f, "elderly"),
        }
    }
}

impl FromStr for Cohort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "young" => Ok(Cohort::Young),
            "adult" | "adult_simple" => Ok(Cohort::Adult),
            "elderly" => Ok(Cohort::Elderly),
            other => Err(ConfigError::UnknownCohort(other.to_string())),
        }
    }
}
