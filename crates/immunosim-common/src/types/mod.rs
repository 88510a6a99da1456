//! Core data types shared across Immunosim crates

pub mod ids;
pub mod medicament;
