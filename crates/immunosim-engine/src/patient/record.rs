//! Patient - one host, its immune responses, and its medication doses
//!
//! All mutable state sits behind a per-patient lock. Every operation takes the
//! lock once, reads a consistent view, and writes its results back before
//! releasing it, so concurrent callers on the same patient never observe or
//! produce a half-applied update.

use std::collections::{BTreeMap, HashMap};

use immunosim_common::{clamp_non_negative, EntityError, Medicament, MedicamentId, PathogeneId};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::doses::DoseLedger;
use super::snapshot::{DoseSnapshot, PathogenSnapshot, PatientSnapshot};
use crate::cohort::{Cohort, ImmuneParams};
use crate::pathogen::{LoadModel, Pathogene};

/// A pathogen hosted by the patient together with the response against it
#[derive(Debug, Clone)]
struct Tracked {
    pathogene: Pathogene,
    response: f64,
}

#[derive(Debug, Default)]
struct PatientState {
    tracked: BTreeMap<PathogeneId, Tracked>,
    doses: DoseLedger,
}

impl PatientState {
    /// Reject any id the patient does not host
    fn ensure_tracked<'a>(
        &self,
        patient_id: &str,
        ids: impl IntoIterator<Item = &'a PathogeneId>,
    ) -> Result<(), EntityError> {
        for id in ids {
            if !self.tracked.contains_key(id) {
                return Err(EntityError::UntrackedEntity {
                    patient_id: patient_id.to_string(),
                    pathogene_id: id.value(),
                });
            }
        }
        Ok(())
    }
}

/// Patient record
#[derive(Debug)]
pub struct Patient {
    id: String,
    cohort: Cohort,
    params: ImmuneParams,
    state: Mutex<PatientState>,
}

impl Patient {
    /// Create a patient. The cohort cannot change afterwards.
    pub fn new(
        id: impl Into<String>,
        cohort: Cohort,
        beta: f64,
        fatigue_coeff: f64,
    ) -> Result<Self, EntityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EntityError::invalid("patient id must not be empty"));
        }

        Ok(Self {
            id,
            cohort,
            params: ImmuneParams::new(beta, fatigue_coeff)?,
            state: Mutex::new(PatientState::default()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cohort(&self) -> Cohort {
        self.cohort
    }

    pub fn params(&self) -> ImmuneParams {
        self.params
    }

    /// Response the cohort formula would produce, without touching state
    pub fn response_formula(&self, next_load: f64, current: f64) -> f64 {
        self.cohort.next_response(&self.params, next_load, current)
    }

    /// Begin tracking a pathogen with `max(0, initial_response)`.
    ///
    /// Returns `false` and changes nothing when the pathogen is already tracked.
    pub fn add_pathogene(&self, pathogene: Pathogene, initial_response: f64) -> Result<bool, EntityError> {
        EntityError::require_finite("initial immune response", initial_response)?;

        let mut state = self.state.lock();
        if state.tracked.contains_key(&pathogene.id) {
            return Ok(false);
        }

        debug!(patient = %self.id, pathogene = %pathogene.id, "Tracking pathogen");
        state.tracked.insert(
            pathogene.id,
            Tracked {
                pathogene,
                response: clamp_non_negative(initial_response),
            },
        );
        Ok(true)
    }

    /// Stop tracking a pathogen. Untracked ids are ignored.
    pub fn remove_pathogene(&self, id: PathogeneId) -> Option<Pathogene> {
        let removed = self.state.lock().tracked.remove(&id);
        if removed.is_some() {
            debug!(patient = %self.id, pathogene = %id, "Stopped tracking pathogen");
        }
        removed.map(|t| t.pathogene)
    }

    pub fn is_tracking(&self, id: PathogeneId) -> bool {
        self.state.lock().tracked.contains_key(&id)
    }

    /// Copy of every tracked pathogen, ordered by id
    pub fn pathogenes(&self) -> Vec<Pathogene> {
        self.state
            .lock()
            .tracked
            .values()
            .map(|t| t.pathogene.clone())
            .collect()
    }

    pub fn pathogene(&self, id: PathogeneId) -> Option<Pathogene> {
        self.state.lock().tracked.get(&id).map(|t| t.pathogene.clone())
    }

    pub fn pathogene_count(&self) -> usize {
        self.state.lock().tracked.len()
    }

    /// Current response against a pathogen; 0 if untracked
    pub fn immune_response(&self, id: PathogeneId) -> f64 {
        self.state
            .lock()
            .tracked
            .get(&id)
            .map(|t| t.response)
            .unwrap_or(0.0)
    }

    pub fn immune_responses(&self) -> BTreeMap<PathogeneId, f64> {
        self.state
            .lock()
            .tracked
            .iter()
            .map(|(id, t)| (*id, t.response))
            .collect()
    }

    /// Overwrite the response against a tracked pathogen (clamped at 0)
    pub fn set_immune_response(&self, id: PathogeneId, value: f64) -> Result<(), EntityError> {
        EntityError::require_finite("immune response", value)?;

        let mut state = self.state.lock();
        match state.tracked.get_mut(&id) {
            Some(tracked) => {
                tracked.response = clamp_non_negative(value);
                Ok(())
            }
            None => Err(EntityError::UntrackedEntity {
                patient_id: self.id.clone(),
                pathogene_id: id.value(),
            }),
        }
    }

    /// Advance every tracked response by one step.
    ///
    /// `next_loads` gives the next load per pathogen; a tracked pathogen missing
    /// from it falls back to its stored load. Any id in `next_loads` that is not
    /// tracked fails the whole call with `UntrackedEntity` and nothing is
    /// written. On success every response is replaced at once and the full new
    /// mapping is returned.
    #[instrument(skip(self, next_loads), fields(patient = %self.id, cohort = %self.cohort))]
    pub fn update_immune_responses(
        &self,
        next_loads: &HashMap<PathogeneId, f64>,
    ) -> Result<BTreeMap<PathogeneId, f64>, EntityError> {
        for load in next_loads.values() {
            EntityError::require_finite("next load", *load)?;
        }

        let mut state = self.state.lock();
        state.ensure_tracked(&self.id, next_loads.keys())?;

        let updated: BTreeMap<PathogeneId, f64> = state
            .tracked
            .iter()
            .map(|(id, t)| {
                let next_load = next_loads
                    .get(id)
                    .copied()
                    .unwrap_or_else(|| t.pathogene.load());
                (*id, self.response_formula(next_load, t.response))
            })
            .collect();

        for (id, response) in &updated {
            if let Some(tracked) = state.tracked.get_mut(id) {
                tracked.response = *response;
            }
        }

        debug!(updated = updated.len(), "Immune responses advanced");
        Ok(updated)
    }

    /// Next load for every tracked pathogen, all computed from one snapshot of
    /// concentrations and responses. Nothing is written.
    pub fn next_loads(&self, model: &LoadModel) -> HashMap<PathogeneId, f64> {
        let state = self.state.lock();
        let concentrations = state.doses.concentrations();
        state
            .tracked
            .iter()
            .map(|(id, t)| {
                (
                    *id,
                    t.pathogene
                        .next_load_under_pressure(model, &concentrations, t.response),
                )
            })
            .collect()
    }

    /// Write next loads back into the tracked pathogens (clamped at 0).
    ///
    /// All-or-nothing: an untracked id or a non-finite load rejects the call.
    pub fn commit_loads(&self, next_loads: &HashMap<PathogeneId, f64>) -> Result<(), EntityError> {
        for load in next_loads.values() {
            EntityError::require_finite("next load", *load)?;
        }

        let mut state = self.state.lock();
        state.ensure_tracked(&self.id, next_loads.keys())?;

        for (id, load) in next_loads {
            if let Some(tracked) = state.tracked.get_mut(id) {
                tracked.pathogene.set_load(*load)?;
            }
        }
        Ok(())
    }

    /// Cumulative administration; returns the stored concentration
    pub fn add_dose(&self, medicament: &Medicament, amount: f64) -> Result<f64, EntityError> {
        let stored = self.state.lock().doses.add(medicament, amount)?;
        debug!(patient = %self.id, medicament = %medicament.id, amount, stored, "Dose added");
        Ok(stored)
    }

    /// Absolute replacement; returns the stored concentration
    pub fn set_dose(&self, medicament: &Medicament, amount: f64) -> Result<f64, EntityError> {
        self.state.lock().doses.set(medicament, amount)
    }

    /// Current concentration; 0 if never administered
    pub fn dose(&self, medicament_id: &str) -> f64 {
        self.state.lock().doses.get(medicament_id)
    }

    /// One step of decay for every medication in the host
    pub fn apply_decay(&self) {
        let mut state = self.state.lock();
        state.doses.decay();
        debug!(patient = %self.id, medications = state.doses.len(), "Doses decayed");
    }

    /// Copy of the dose ledger
    pub fn doses(&self) -> DoseLedger {
        self.state.lock().doses.clone()
    }

    /// Replace the dose ledger wholesale, e.g. to undo a failed step
    pub fn restore_doses(&self, doses: DoseLedger) {
        self.state.lock().doses = doses;
    }

    /// Concentrations keyed by medication id
    pub fn concentrations_by_id(&self) -> HashMap<MedicamentId, f64> {
        self.state.lock().doses.concentrations()
    }

    pub fn snapshot(&self) -> PatientSnapshot {
        let state = self.state.lock();
        PatientSnapshot {
            patient_id: self.id.clone(),
            cohort: self.cohort,
            beta: self.params.beta,
            fatigue_coeff: self.params.fatigue_coeff,
            pathogens: state
                .tracked
                .values()
                .map(|t| PathogenSnapshot {
                    id: t.pathogene.id,
                    load: t.pathogene.load(),
                    immune_response: t.response,
                })
                .collect(),
            doses: state
                .doses
                .iter()
                .map(|entry| DoseSnapshot {
                    medicament_id: entry.medicament.id.clone(),
                    h: entry.medicament.h(),
                    dose: entry.concentration,
                })
                .collect(),
            taken_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adult() -> Patient {
        Patient::new("patient-1", Cohort::Adult, 0.5, 0.2).unwrap()
    }

    fn strain(id: u32, load: f64) -> Pathogene {
        Pathogene::builder(id, load).build().unwrap()
    }

    #[test]
    fn test_new_rejects_blank_id() {
        assert!(Patient::new(" ", Cohort::Young, 0.1, 0.1).is_err());
        assert!(Patient::new("p", Cohort::Young, f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_add_pathogene_idempotent() {
        let patient = adult();
        assert!(patient.add_pathogene(strain(1, 10.0), 4.0).unwrap());
        assert!(!patient.add_pathogene(strain(1, 99.0), 8.0).unwrap());

        assert_eq!(patient.immune_response(PathogeneId(1)), 4.0);
        assert_eq!(patient.pathogene(PathogeneId(1)).unwrap().load(), 10.0);
        assert_eq!(patient.pathogene_count(), 1);
    }

    #[test]
    fn test_add_pathogene_clamps_initial_response() {
        let patient = adult();
        patient.add_pathogene(strain(1, 10.0), -2.0).unwrap();
        assert_eq!(patient.immune_response(PathogeneId(1)), 0.0);
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let patient = adult();
        assert!(patient.remove_pathogene(PathogeneId(3)).is_none());

        patient.add_pathogene(strain(3, 1.0), 1.0).unwrap();
        assert!(patient.remove_pathogene(PathogeneId(3)).is_some());
        assert!(!patient.is_tracking(PathogeneId(3)));
        assert_eq!(patient.immune_response(PathogeneId(3)), 0.0);
    }

    #[test]
    fn test_set_immune_response() {
        let patient = adult();
        let err = patient.set_immune_response(PathogeneId(1), 3.0).unwrap_err();
        assert!(matches!(err, EntityError::UntrackedEntity { pathogene_id: 1, .. }));

        patient.add_pathogene(strain(1, 10.0), 0.0).unwrap();
        patient.set_immune_response(PathogeneId(1), -3.0).unwrap();
        assert_eq!(patient.immune_response(PathogeneId(1)), 0.0);
        patient.set_immune_response(PathogeneId(1), 3.0).unwrap();
        assert_eq!(patient.immune_response(PathogeneId(1)), 3.0);
    }

    #[test]
    fn test_update_uses_cohort_formula() {
        let patient = adult();
        patient.add_pathogene(strain(1, 5.0), 10.0).unwrap();

        let mut next = HashMap::new();
        next.insert(PathogeneId(1), 100.0);
        let updated = patient.update_immune_responses(&next).unwrap();

        assert!((updated[&PathogeneId(1)] - 58.0).abs() < 1e-9);
        assert!((patient.immune_response(PathogeneId(1)) - 58.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_falls_back_to_stored_load() {
        let patient = adult();
        patient.add_pathogene(strain(1, 100.0), 10.0).unwrap();
        patient.add_pathogene(strain(2, 20.0), 10.0).unwrap();

        let mut next = HashMap::new();
        next.insert(PathogeneId(1), 0.0);
        let updated = patient.update_immune_responses(&next).unwrap();

        assert_eq!(updated.len(), 2);
        // 10 + 0.5 * 20 - 0.2 * 10
        assert!((updated[&PathogeneId(2)] - 18.0).abs() < 1e-9);
        // 10 + 0 - 2
        assert!((updated[&PathogeneId(1)] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_rejects_untracked_without_side_effects() {
        let patient = adult();
        patient.add_pathogene(strain(1, 100.0), 10.0).unwrap();

        let mut next = HashMap::new();
        next.insert(PathogeneId(1), 50.0);
        next.insert(PathogeneId(9), 50.0);

        let err = patient.update_immune_responses(&next).unwrap_err();
        assert!(matches!(err, EntityError::UntrackedEntity { pathogene_id: 9, .. }));
        assert_eq!(patient.immune_response(PathogeneId(1)), 10.0);
    }

    #[test]
    fn test_update_floors_negative_loads() {
        let patient = adult();
        patient.add_pathogene(strain(1, 0.0), 10.0).unwrap();

        let mut next = HashMap::new();
        next.insert(PathogeneId(1), -1000.0);
        let updated = patient.update_immune_responses(&next).unwrap();
        assert!((updated[&PathogeneId(1)] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_next_loads_then_commit() {
        let patient = adult();
        let p = Pathogene::builder(1, 10.0)
            .growth_rate(0.2)
            .sensitivity("cipro", 1.0)
            .build()
            .unwrap();
        patient.add_pathogene(p, 0.0).unwrap();
        patient
            .add_dose(&Medicament::new("cipro", 0.5).unwrap(), 0.1)
            .unwrap();

        let next = patient.next_loads(&LoadModel::default());
        // 10 * (1 + 0.2 - 0.1)
        assert!((next[&PathogeneId(1)] - 11.0).abs() < 1e-9);
        assert_eq!(patient.pathogene(PathogeneId(1)).unwrap().load(), 10.0);

        patient.commit_loads(&next).unwrap();
        assert!((patient.pathogene(PathogeneId(1)).unwrap().load() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_commit_loads_all_or_nothing() {
        let patient = adult();
        patient.add_pathogene(strain(1, 10.0), 0.0).unwrap();

        let mut next = HashMap::new();
        next.insert(PathogeneId(1), 3.0);
        next.insert(PathogeneId(2), 3.0);
        assert!(patient.commit_loads(&next).is_err());
        assert_eq!(patient.pathogene(PathogeneId(1)).unwrap().load(), 10.0);
    }

    #[test]
    fn test_doses_through_patient() {
        let patient = adult();
        let med = Medicament::new("amoxicillin", 0.5).unwrap();

        patient.add_dose(&med, 5.0).unwrap();
        patient.add_dose(&med, -3.0).unwrap();
        assert_eq!(patient.dose("amoxicillin"), 2.0);

        patient.set_dose(&med, 100.0).unwrap();
        patient.apply_decay();
        assert_eq!(patient.dose("amoxicillin"), 50.0);
        assert_eq!(patient.dose("unknown"), 0.0);
        assert_eq!(patient.concentrations_by_id().get("amoxicillin"), Some(&50.0));
    }

    #[test]
    fn test_restore_doses() {
        let patient = adult();
        let med = Medicament::new("amoxicillin", 0.5).unwrap();
        patient.set_dose(&med, 10.0).unwrap();

        let saved = patient.doses();
        patient.add_dose(&med, 5.0).unwrap();
        assert_eq!(patient.dose("amoxicillin"), 15.0);

        patient.restore_doses(saved);
        assert_eq!(patient.dose("amoxicillin"), 10.0);
    }

    #[test]
    fn test_huge_loads_stay_finite_through_update() {
        let patient = Patient::new("patient-2", Cohort::Adult, 1e300, 0.2).unwrap();
        let p = Pathogene::builder(1, 1e300).growth_rate(1e10).build().unwrap();
        patient.add_pathogene(p, 0.0).unwrap();

        for _ in 0..3 {
            let next = patient.next_loads(&LoadModel::default());
            assert!(next[&PathogeneId(1)].is_finite());
            patient.update_immune_responses(&next).unwrap();
            patient.commit_loads(&next).unwrap();
        }
        assert_eq!(patient.pathogene(PathogeneId(1)).unwrap().load(), f64::MAX);
        assert!(patient.immune_response(PathogeneId(1)) > 0.0);
    }

    #[test]
    fn test_snapshot() {
        let patient = adult();
        patient.add_pathogene(strain(2, 7.0), 1.5).unwrap();
        patient
            .add_dose(&Medicament::new("cipro", 0.8).unwrap(), 4.0)
            .unwrap();

        let snap = patient.snapshot();
        assert_eq!(snap.patient_id, "patient-1");
        assert_eq!(snap.cohort, Cohort::Adult);
        assert_eq!(snap.pathogens.len(), 1);
        assert_eq!(snap.pathogen(PathogeneId(2)).unwrap().immune_response, 1.5);
        assert_eq!(snap.doses[0].dose, 4.0);
        assert_eq!(snap.total_load(), 7.0);

        let text = snap.to_string();
        assert!(text.contains("P2"));
        assert!(text.contains("cipro"));
    }
}
