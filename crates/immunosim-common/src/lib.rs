//! # Immunosim Common
//!
//! Shared types and errors for the Immunosim host-pathogen engine.
//!
//! ## Core Types
//!
//! - [`PathogeneId`]: integer identity of a pathogen strain
//! - [`MedicamentId`]: string identity of a medication
//! - [`Medicament`]: medication record with its per-step retention factor `h`
//!
//! ## Errors
//!
//! - [`ImmunoError`]: unified error type
//! - [`EntityError`]: precondition violations raised by patients and pathogens
//! - [`ConfigError`]: configuration loading failures

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, EntityError, ImmunoError, Result};
pub use types::{
    ids::{MedicamentId, PathogeneId},
    medicament::Medicament,
};

/// Immunosim version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest admissible decay constant (instantaneous clearance)
pub const MIN_DECAY_CONSTANT: f64 = 0.0;

/// Largest admissible decay constant (no decay)
pub const MAX_DECAY_CONSTANT: f64 = 1.0;

/// Floor applied to every load, response, and dose
pub const CLAMP_FLOOR: f64 = 0.0;

/// Ceiling applied to every load, response, and dose
pub const CLAMP_CEILING: f64 = f64::MAX;

/// Clamp a computed quantity to `[0, f64::MAX]`.
///
/// NaN collapses to the floor and `+inf` saturates at the ceiling, so a
/// stored value is always a finite non-negative number.
#[inline]
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() {
        CLAMP_FLOOR
    } else {
        value.clamp(CLAMP_FLOOR, CLAMP_CEILING)
    }
}
