//! Pathogen strains and their load dynamics

pub mod load_model;
pub mod pathogene;

pub use load_model::LoadModel;
pub use pathogene::{Pathogene, PathogeneBuilder};
