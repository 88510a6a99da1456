//! Patients: per-pathogen immune responses and per-medication doses

pub mod doses;
pub mod record;
pub mod snapshot;

pub use doses::{DoseEntry, DoseLedger};
pub use record::Patient;
pub use snapshot::{DoseSnapshot, PathogenSnapshot, PatientSnapshot};
