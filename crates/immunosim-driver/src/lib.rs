//! # Immunosim Driver
//!
//! Reference timestep loop over a population of patients, with seeded
//! population generation and environment-driven configuration.

pub mod config;
pub mod population;
pub mod simulation;

pub use config::SimulationConfig;
pub use population::{seed_population, Population};
pub use simulation::{Administration, PatientStepReport, Simulation, SkippedPatient, StepReport};

/// Default number of timesteps
pub const DEFAULT_STEPS: u64 = 50;

/// Default population seed
pub const DEFAULT_SEED: u64 = 42;

/// Default number of generated patients
pub const DEFAULT_PATIENTS: usize = 8;

/// Default clearance threshold on pathogen load
pub const DEFAULT_CLEARANCE_THRESHOLD: f64 = 0.01;
