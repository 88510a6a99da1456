//! # Immunosim Engine
//!
//! Per-timestep state transitions for pathogens and host immune responses.
//!
//! ## Update Laws
//!
//! ```text
//! L(t+1) = max(0, L * (1 + r - alpha * Σ c_m * efficacy_m - k * I))
//! I(t+1) = max(0, cohort(L(t+1), I))
//! D(t+1) = max(0, h * D)
//! ```
//!
//! Where:
//! - L: pathogen load
//! - I: patient immune response against that pathogen
//! - D: medication concentration, h its retention factor
//!
//! ## Step Contract
//!
//! A driver computes every next load from one snapshot
//! ([`Patient::next_loads`]), feeds them to
//! [`Patient::update_immune_responses`], commits them with
//! [`Patient::commit_loads`], then calls [`Patient::apply_decay`].

pub mod cohort;
pub mod pathogen;
pub mod patient;

pub use cohort::{Cohort, ImmuneParams};
pub use pathogen::{LoadModel, Pathogene, PathogeneBuilder};
pub use patient::{DoseLedger, DoseSnapshot, PathogenSnapshot, Patient, PatientSnapshot};

pub use immunosim_common::{
    EntityError, ImmunoError, Medicament, MedicamentId, PathogeneId, Result,
};
