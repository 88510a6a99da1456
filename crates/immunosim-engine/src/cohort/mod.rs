//! Age cohorts and their immune-response formulas

pub mod formula;

pub use formula::{Cohort, ImmuneParams};
