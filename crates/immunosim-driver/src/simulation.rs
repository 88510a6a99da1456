//! Timestep driver
//!
//! Each step, for every patient:
//! 1. apply administrations due at this step
//! 2. compute every next load from one snapshot
//! 3. advance immune responses, then commit the loads
//! 4. drop pathogens at or below the clearance threshold
//! 5. decay medication doses
//!
//! A patient whose update is rejected is skipped for the step and reported:
//! its doses are rolled back to where they stood before the step, and other
//! patients are unaffected.

use std::collections::HashMap;

use immunosim_common::{EntityError, Medicament, PathogeneId, Result};
use immunosim_engine::{LoadModel, Patient, PatientSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::SimulationConfig;

/// Scheduled medication administration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Administration {
    /// Receiving patient
    pub patient_id: String,
    /// Medication given
    pub medicament: Medicament,
    /// Amount added to the current concentration
    pub amount: f64,
    /// First step at which it is given
    pub at_step: u64,
    /// Repeat interval in steps; `None` for a single dose
    pub every: Option<u64>,
}

impl Administration {
    pub fn is_due(&self, step: u64) -> bool {
        if step < self.at_step {
            return false;
        }
        match self.every {
            Some(interval) if interval > 0 => (step - self.at_step) % interval == 0,
            _ => step == self.at_step,
        }
    }
}

/// Outcome of one step for one patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientStepReport {
    pub patient_id: String,
    pub total_load: f64,
    pub cleared: Vec<PathogeneId>,
}

/// A patient left untouched for a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedPatient {
    pub patient_id: String,
    pub reason: String,
}

/// Outcome of one step across the population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u64,
    pub patients: Vec<PatientStepReport>,
    pub skipped: Vec<SkippedPatient>,
}

impl StepReport {
    pub fn total_load(&self) -> f64 {
        self.patients.iter().map(|p| p.total_load).sum()
    }
}

/// Population-level simulation
pub struct Simulation {
    model: LoadModel,
    clearance_threshold: f64,
    patients: Vec<Patient>,
    schedule: Vec<Administration>,
    step: u64,
}

impl Simulation {
    pub fn new(model: LoadModel, clearance_threshold: f64) -> Self {
        Self {
            model,
            clearance_threshold,
            patients: Vec::new(),
            schedule: Vec::new(),
            step: 0,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.load_model.clone(), config.clearance_threshold)
    }

    /// Register a patient; ids must be unique
    pub fn add_patient(&mut self, patient: Patient) -> Result<()> {
        if self.patient(patient.id()).is_some() {
            return Err(EntityError::InvalidArgument(format!(
                "duplicate patient id {}",
                patient.id()
            ))
            .into());
        }
        self.patients.push(patient);
        Ok(())
    }

    /// Schedule an administration for a registered patient
    pub fn schedule(&mut self, administration: Administration) -> Result<()> {
        EntityError::require_finite("administration amount", administration.amount)?;
        if self.patient(&administration.patient_id).is_none() {
            return Err(EntityError::InvalidArgument(format!(
                "no patient {} to administer {} to",
                administration.patient_id, administration.medicament.id
            ))
            .into());
        }
        self.schedule.push(administration);
        Ok(())
    }

    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id() == id)
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Index of the next step to run
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn snapshots(&self) -> Vec<PatientSnapshot> {
        self.patients.iter().map(Patient::snapshot).collect()
    }

    /// Every patient snapshot as pretty-printed JSON
    pub fn snapshots_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshots())?)
    }

    /// Run one step across every patient
    #[instrument(skip(self), fields(step = self.step))]
    pub fn step(&mut self) -> StepReport {
        let step = self.step;
        let mut report = StepReport {
            step,
            patients: Vec::with_capacity(self.patients.len()),
            skipped: Vec::new(),
        };

        for patient in &self.patients {
            match self.advance_patient(patient, step) {
                Ok(patient_report) => report.patients.push(patient_report),
                Err(e) => {
                    warn!(patient = %patient.id(), error = %e, "Skipping patient for this step");
                    report.skipped.push(SkippedPatient {
                        patient_id: patient.id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            total_load = report.total_load(),
            skipped = report.skipped.len(),
            "Step complete"
        );
        self.step += 1;
        report
    }

    /// Run `steps` steps, returning every report
    pub fn run(&mut self, steps: u64) -> Vec<StepReport> {
        info!(steps, patients = self.patients.len(), "Running simulation");
        (0..steps).map(|_| self.step()).collect()
    }

    fn advance_patient(&self, patient: &Patient, step: u64) -> Result<PatientStepReport> {
        let doses_before = patient.doses();
        let next_loads = match self.administer_and_respond(patient, step) {
            Ok(next_loads) => next_loads,
            Err(e) => {
                patient.restore_doses(doses_before);
                return Err(e.into());
            }
        };

        let mut cleared: Vec<PathogeneId> = next_loads
            .iter()
            .filter(|(_, load)| **load <= self.clearance_threshold)
            .map(|(id, _)| *id)
            .collect();
        cleared.sort();
        for id in &cleared {
            patient.remove_pathogene(*id);
            debug!(patient = %patient.id(), pathogene = %id, "Infection cleared");
        }

        patient.apply_decay();

        let total_load = patient.pathogenes().iter().map(|p| p.load()).sum();
        Ok(PatientStepReport {
            patient_id: patient.id().to_string(),
            total_load,
            cleared,
        })
    }

    /// Dose, then advance responses and loads.
    ///
    /// Responses and loads are validated against the same map before either
    /// is written, so a rejection leaves only the doses to undo.
    fn administer_and_respond(
        &self,
        patient: &Patient,
        step: u64,
    ) -> std::result::Result<HashMap<PathogeneId, f64>, EntityError> {
        for administration in self
            .schedule
            .iter()
            .filter(|a| a.patient_id == patient.id() && a.is_due(step))
        {
            patient.add_dose(&administration.medicament, administration.amount)?;
        }

        let next_loads = patient.next_loads(&self.model);
        patient.update_immune_responses(&next_loads)?;
        patient.commit_loads(&next_loads)?;
        Ok(next_loads)
    }
}
