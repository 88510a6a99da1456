//! Pathogene - one pathogen strain living in one host
//!
//! A strain carries its current load plus the coefficients that drive its
//! dynamics. The load is only ever written by the host after every strain of
//! the step has been computed from the same snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use immunosim_common::{clamp_non_negative, EntityError, MedicamentId, PathogeneId};
use serde::{Deserialize, Serialize};

use super::LoadModel;

/// Pathogen strain
///
/// Deserialisation is validated: every coefficient must be finite and the
/// load must be finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPathogene")]
pub struct Pathogene {
    /// Strain identity
    pub id: PathogeneId,

    /// Current burden, never negative
    load: f64,

    /// Intrinsic per-step reproduction rate
    pub growth_rate: f64,

    /// Sensitivity of the strain to medication pressure
    pub alpha: f64,

    /// Resistance coefficient per medication
    pub resistance: BTreeMap<MedicamentId, f64>,

    /// Sensitivity coefficient per medication
    pub sensitivity: BTreeMap<MedicamentId, f64>,

    /// How strongly the host response suppresses the strain
    pub immune_reactivity: f64,
}

/// Unvalidated wire form of [`Pathogene`]
#[derive(Deserialize)]
struct RawPathogene {
    id: PathogeneId,
    load: f64,
    growth_rate: f64,
    alpha: f64,
    #[serde(default)]
    resistance: BTreeMap<MedicamentId, f64>,
    #[serde(default)]
    sensitivity: BTreeMap<MedicamentId, f64>,
    immune_reactivity: f64,
}

impl TryFrom<RawPathogene> for Pathogene {
    type Error = EntityError;

    fn try_from(raw: RawPathogene) -> Result<Self, Self::Error> {
        let load = EntityError::require_finite("load", raw.load)?;
        if load < 0.0 {
            return Err(EntityError::InvalidArgument(format!(
                "load of {} must be non-negative, got {}",
                raw.id, load
            )));
        }
        EntityError::require_finite("growth_rate", raw.growth_rate)?;
        EntityError::require_finite("alpha", raw.alpha)?;
        EntityError::require_finite("immune_reactivity", raw.immune_reactivity)?;
        for value in raw.resistance.values() {
            EntityError::require_finite("resistance", *value)?;
        }
        for value in raw.sensitivity.values() {
            EntityError::require_finite("sensitivity", *value)?;
        }

        Ok(Pathogene {
            id: raw.id,
            load,
            growth_rate: raw.growth_rate,
            alpha: raw.alpha,
            resistance: raw.resistance,
            sensitivity: raw.sensitivity,
            immune_reactivity: raw.immune_reactivity,
        })
    }
}

impl Pathogene {
    /// Start building a strain with the given id and initial load
    pub fn builder(id: u32, initial_load: f64) -> PathogeneBuilder {
        PathogeneBuilder::new(id, initial_load)
    }

    #[inline]
    pub fn load(&self) -> f64 {
        self.load
    }

    /// Overwrite the load, clamping negatives to 0
    pub fn set_load(&mut self, load: f64) -> Result<(), EntityError> {
        EntityError::require_finite("load", load)?;
        self.load = clamp_non_negative(load);
        Ok(())
    }

    pub fn resistance_to(&self, med: &MedicamentId) -> f64 {
        self.resistance.get(med).copied().unwrap_or(0.0)
    }

    pub fn sensitivity_to(&self, med: &MedicamentId) -> f64 {
        self.sensitivity.get(med).copied().unwrap_or(0.0)
    }

    /// Every medication this strain has a coefficient for
    pub fn medications(&self) -> impl Iterator<Item = &MedicamentId> + '_ {
        let meds: BTreeSet<&MedicamentId> = self
            .resistance
            .keys()
            .chain(self.sensitivity.keys())
            .collect();
        meds.into_iter()
    }

    /// Next load under medication pressure alone
    pub fn next_load(&self, model: &LoadModel, concentrations: &HashMap<MedicamentId, f64>) -> f64 {
        model.next_load(self, concentrations, 0.0)
    }

    /// Next load under both medication and immune pressure
    pub fn next_load_under_pressure(
        &self,
        model: &LoadModel,
        concentrations: &HashMap<MedicamentId, f64>,
        immune_response: f64,
    ) -> f64 {
        model.next_load(self, concentrations, immune_response)
    }
}

impl std::fmt::Display for Pathogene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pathogene({}, L={:.4}, r={:.3}, alpha={:.3})",
            self.id, self.load, self.growth_rate, self.alpha
        )
    }
}

/// Builder for [`Pathogene`]
#[derive(Debug, Clone)]
pub struct PathogeneBuilder {
    id: u32,
    load: f64,
    growth_rate: f64,
    alpha: f64,
    resistance: Vec<(String, f64)>,
    sensitivity: Vec<(String, f64)>,
    immune_reactivity: f64,
}

impl PathogeneBuilder {
    pub fn new(id: u32, initial_load: f64) -> Self {
        Self {
            id,
            load: initial_load,
            growth_rate: 0.0,
            alpha: 1.0,
            resistance: Vec::new(),
            sensitivity: Vec::new(),
            immune_reactivity: 0.0,
        }
    }

    pub fn growth_rate(mut self, rate: f64) -> Self {
        self.growth_rate = rate;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn resistance(mut self, med: impl Into<String>, coefficient: f64) -> Self {
        self.resistance.push((med.into(), coefficient));
        self
    }

    pub fn sensitivity(mut self, med: impl Into<String>, coefficient: f64) -> Self {
        self.sensitivity.push((med.into(), coefficient));
        self
    }

    pub fn immune_reactivity(mut self, reactivity: f64) -> Self {
        self.immune_reactivity = reactivity;
        self
    }

    /// Validate and build. A negative initial load is clamped to 0.
    pub fn build(self) -> Result<Pathogene, EntityError> {
        EntityError::require_finite("load", self.load)?;
        EntityError::require_finite("growth_rate", self.growth_rate)?;
        EntityError::require_finite("alpha", self.alpha)?;
        EntityError::require_finite("immune_reactivity", self.immune_reactivity)?;

        Ok(Pathogene {
            id: PathogeneId(self.id),
            load: clamp_non_negative(self.load),
            growth_rate: self.growth_rate,
            alpha: self.alpha,
            resistance: coefficients("resistance", self.resistance)?,
            sensitivity: coefficients("sensitivity", self.sensitivity)?,
            immune_reactivity: self.immune_reactivity,
        })
    }
}

fn coefficients(
    name: &str,
    entries: Vec<(String, f64)>,
) -> Result<BTreeMap<MedicamentId, f64>, EntityError> {
    entries
        .into_iter()
        .map(|(med, value)| -> Result<(MedicamentId, f64), EntityError> {
            EntityError::require_finite(name, value)?;
            Ok((MedicamentId::new(med)?, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let p = Pathogene::builder(7, 12.5).build().unwrap();
        assert_eq!(p.id, PathogeneId(7));
        assert_eq!(p.load(), 12.5);
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.medications().count(), 0);
    }

    #[test]
    fn test_negative_initial_load_clamped() {
        let p = Pathogene::builder(1, -3.0).build().unwrap();
        assert_eq!(p.load(), 0.0);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(Pathogene::builder(1, f64::NAN).build().is_err());
        assert!(Pathogene::builder(1, 1.0).resistance("", 0.5).build().is_err());
        assert!(Pathogene::builder(1, 1.0)
            .sensitivity("amox", f64::INFINITY)
            .build()
            .is_err());
    }

    #[test]
    fn test_medications_union() {
        let p = Pathogene::builder(1, 1.0)
            .resistance("a", 0.1)
            .resistance("b", 0.2)
            .sensitivity("b", 0.9)
            .sensitivity("c", 0.4)
            .build()
            .unwrap();
        let meds: Vec<_> = p.medications().map(|m| m.as_str().to_string()).collect();
        assert_eq!(meds, vec!["a", "b", "c"]);
        assert_eq!(p.resistance_to(&MedicamentId::new("c").unwrap()), 0.0);
    }

    #[test]
    fn test_next_load_is_pure() {
        let p = Pathogene::builder(1, 10.0).growth_rate(0.5).build().unwrap();
        let next = p.next_load(&LoadModel::default(), &HashMap::new());
        assert!((next - 15.0).abs() < 1e-9);
        assert_eq!(p.load(), 10.0);
    }

    #[test]
    fn test_next_load_uses_given_model() {
        let p = Pathogene::builder(1, 10.0)
            .sensitivity("cipro", 1.0)
            .build()
            .unwrap();
        let mut conc = HashMap::new();
        conc.insert(MedicamentId::new("cipro").unwrap(), 0.5);

        assert!((p.next_load(&LoadModel::default(), &conc) - 5.0).abs() < 1e-9);
        let gentle = LoadModel::new(0.2, 1.0, None).unwrap();
        assert!((p.next_load(&gentle, &conc) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"id":1,"load":4.0,"growth_rate":0.1,"alpha":1.0,
            "resistance":{"amox":0.5},"sensitivity":{},"immune_reactivity":0.2}"#;
        let p: Pathogene = serde_json::from_str(json).unwrap();
        assert_eq!(p.load(), 4.0);
        assert_eq!(p.resistance_to(&MedicamentId::new("amox").unwrap()), 0.5);

        let negative = r#"{"id":1,"load":-5.0,"growth_rate":0.1,"alpha":1.0,
            "resistance":{},"sensitivity":{},"immune_reactivity":0.2}"#;
        assert!(serde_json::from_str::<Pathogene>(negative).is_err());

        let blank_med = r#"{"id":1,"load":1.0,"growth_rate":0.1,"alpha":1.0,
            "resistance":{"":0.5},"sensitivity":{},"immune_reactivity":0.2}"#;
        assert!(serde_json::from_str::<Pathogene>(blank_med).is_err());
    }

    #[test]
    fn test_serialize_then_deserialize_keeps_record() {
        let p = Pathogene::builder(3, 2.5)
            .growth_rate(0.2)
            .resistance("amox", 0.3)
            .sensitivity("cipro", 0.9)
            .build()
            .unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(serde_json::from_str::<Pathogene>(&json).unwrap(), p);
    }

    #[test]
    fn test_set_load_clamps() {
        let mut p = Pathogene::builder(1, 10.0).build().unwrap();
        p.set_load(-1.0).unwrap();
        assert_eq!(p.load(), 0.0);
        assert!(p.set_load(f64::NAN).is_err());
        assert_eq!(p.load(), 0.0);
    }
}
