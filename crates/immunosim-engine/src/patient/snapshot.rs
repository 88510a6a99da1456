//! Read-only view of a patient's state, for reporting

use immunosim_common::{MedicamentId, PathogeneId};
use serde::{Deserialize, Serialize};

use crate::cohort::Cohort;

/// One tracked pathogen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathogenSnapshot {
    pub id: PathogeneId,
    pub load: f64,
    pub immune_response: f64,
}

/// One medication in the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseSnapshot {
    pub medicament_id: MedicamentId,
    pub h: f64,
    pub dose: f64,
}

/// Full patient state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient_id: String,
    pub cohort: Cohort,
    pub beta: f64,
    pub fatigue_coeff: f64,
    pub pathogens: Vec<PathogenSnapshot>,
    pub doses: Vec<DoseSnapshot>,
    /// Capture time (Unix milliseconds)
    pub taken_at: i64,
}

impl PatientSnapshot {
    /// Sum of all pathogen loads
    pub fn total_load(&self) -> f64 {
        self.pathogens.iter().map(|p| p.load).sum()
    }

    pub fn pathogen(&self, id: PathogeneId) -> Option<&PathogenSnapshot> {
        self.pathogens.iter().find(|p| p.id == id)
    }
}

impl std::fmt::Display for PatientSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Patient {} ({})", self.patient_id, self.cohort)?;
        for p in &self.pathogens {
            writeln!(f, "  - {} : L={:.4} | I={:.4}", p.id, p.load, p.immune_response)?;
        }
        writeln!(f, "  medications:")?;
        for d in &self.doses {
            writeln!(f, "  - {} : dose={:.4}", d.medicament_id, d.dose)?;
        }
        Ok(())
    }
}
