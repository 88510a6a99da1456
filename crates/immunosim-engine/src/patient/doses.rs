//! Dose ledger - concentration of every medication a host has received
//!
//! Entries are created on first administration and never removed; a fully
//! decayed medication stays in the ledger at concentration 0.

use std::collections::{BTreeMap, HashMap};

use immunosim_common::{clamp_non_negative, EntityError, Medicament, MedicamentId};
use serde::{Deserialize, Serialize};

/// Current concentration of one medication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEntry {
    /// Medication record, refreshed on every administration
    pub medicament: Medicament,
    /// Concentration present in the host, never negative
    pub concentration: f64,
}

/// Per-host medication concentrations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoseLedger {
    entries: BTreeMap<MedicamentId, DoseEntry>,
}

impl DoseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the current concentration (negative amounts withdraw).
    ///
    /// Returns the stored concentration.
    pub fn add(&mut self, medicament: &Medicament, amount: f64) -> Result<f64, EntityError> {
        EntityError::require_finite("dose amount", amount)?;
        let before = self.get(medicament.id.as_str());
        Ok(self.store(medicament, before + amount))
    }

    /// Replace the current concentration. Returns the stored concentration.
    pub fn set(&mut self, medicament: &Medicament, amount: f64) -> Result<f64, EntityError> {
        EntityError::require_finite("dose amount", amount)?;
        Ok(self.store(medicament, amount))
    }

    fn store(&mut self, medicament: &Medicament, concentration: f64) -> f64 {
        let concentration = clamp_non_negative(concentration);
        self.entries.insert(
            medicament.id.clone(),
            DoseEntry {
                medicament: medicament.clone(),
                concentration,
            },
        );
        concentration
    }

    /// Concentration of a medication; 0 if it was never administered
    pub fn get(&self, id: &str) -> f64 {
        self.entries
            .get(id)
            .map(|entry| entry.concentration)
            .unwrap_or(0.0)
    }

    /// One step of geometric decay for every tracked medication.
    ///
    /// All new concentrations come from the pre-decay values.
    pub fn decay(&mut self) {
        let decayed: Vec<(MedicamentId, f64)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.medicament.decay(entry.concentration)))
            .collect();

        for (id, concentration) in decayed {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.concentration = concentration;
            }
        }
    }

    /// Concentrations keyed by medication id, as consumed by pathogens
    pub fn concentrations(&self) -> HashMap<MedicamentId, f64> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.concentration))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DoseEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
