//! Simulation configuration

use std::str::FromStr;

use immunosim_common::{ConfigError, Result};
use immunosim_engine::LoadModel;
use serde::{Deserialize, Serialize};

/// Driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of timesteps to run
    pub steps: u64,
    /// Seed for the generated population
    pub seed: u64,
    /// Number of generated patients
    pub patients: usize,
    /// Loads at or below this value count as cleared
    pub clearance_threshold: f64,
    /// Load update weights
    pub load_model: LoadModel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: crate::DEFAULT_STEPS,
            seed: crate::DEFAULT_SEED,
            patients: crate::DEFAULT_PATIENTS,
            clearance_threshold: crate::DEFAULT_CLEARANCE_THRESHOLD,
            load_model: LoadModel::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from `.env` and `IMMUNOSIM_*` environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults, overriding any key `lookup` resolves
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        override_with(&lookup, "IMMUNOSIM_STEPS", &mut cfg.steps)?;
        override_with(&lookup, "IMMUNOSIM_SEED", &mut cfg.seed)?;
        override_with(&lookup, "IMMUNOSIM_PATIENTS", &mut cfg.patients)?;
        override_with(&lookup, "IMMUNOSIM_CLEARANCE_THRESHOLD", &mut cfg.clearance_threshold)?;

        // Load model weights
        let mut drug_weight = cfg.load_model.drug_weight;
        let mut immune_weight = cfg.load_model.immune_weight;
        override_with(&lookup, "IMMUNOSIM_DRUG_WEIGHT", &mut drug_weight)?;
        override_with(&lookup, "IMMUNOSIM_IMMUNE_WEIGHT", &mut immune_weight)?;

        let mut max_load = cfg.load_model.max_load;
        if let Some(raw) = lookup("IMMUNOSIM_MAX_LOAD") {
            max_load = Some(parse("IMMUNOSIM_MAX_LOAD", &raw)?);
        }

        cfg.load_model = LoadModel::new(drug_weight, immune_weight, max_load).map_err(|e| {
            ConfigError::InvalidValue {
                key: "load_model".to_string(),
                value: e.to_string(),
            }
        })?;

        if !(cfg.clearance_threshold.is_finite() && cfg.clearance_threshold >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "IMMUNOSIM_CLEARANCE_THRESHOLD".to_string(),
                value: cfg.clearance_threshold.to_string(),
            }
            .into());
        }

        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> std::result::Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn override_with<F, T>(
    lookup: &F,
    key: &str,
    target: &mut T,
) -> std::result::Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = parse(key, &raw)?;
    }
    Ok(())
}
