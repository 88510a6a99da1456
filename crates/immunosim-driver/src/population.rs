//! Seeded demo population
//!
//! Generates patients, strains, and a treatment schedule from a single seed
//! so runs are reproducible.

use immunosim_common::{Medicament, Result};
use immunosim_engine::{Cohort, Pathogene, Patient};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::simulation::Administration;

/// Medications available to the generated schedule: (id, retention factor)
pub const FORMULARY: [(&str, f64); 3] = [
    ("amoxicillin", 0.70),
    ("ciprofloxacin", 0.50),
    ("doxycycline", 0.85),
];

/// Steps between repeated administrations
pub const DOSING_INTERVAL: u64 = 3;

/// Generated patients and their schedule
pub struct Population {
    pub patients: Vec<Patient>,
    pub schedule: Vec<Administration>,
}

/// Build `count` patients from `seed`
pub fn seed_population(count: usize, seed: u64) -> Result<Population> {
    let mut rng = StdRng::seed_from_u64(seed);
    let formulary = FORMULARY
        .iter()
        .map(|(id, h)| Medicament::new(*id, *h))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut patients = Vec::with_capacity(count);
    let mut schedule = Vec::with_capacity(count);
    let mut next_pathogene_id = 0u32;

    for index in 0..count {
        let cohort = Cohort::ALL[rng.gen_range(0..Cohort::ALL.len())];
        let patient = Patient::new(
            format!("patient-{:03}", index),
            cohort,
            rng.gen_range(0.005..0.05),
            rng.gen_range(0.05..0.2),
        )?;

        for _ in 0..rng.gen_range(1..=3) {
            let mut builder = Pathogene::builder(next_pathogene_id, rng.gen_range(10.0..100.0))
                .growth_rate(rng.gen_range(0.05..0.3))
                .alpha(rng.gen_range(0.5..1.0))
                .immune_reactivity(rng.gen_range(0.001..0.01));
            for med in &formulary {
                builder = builder
                    .resistance(med.id.as_str(), rng.gen_range(0.0..1.0))
                    .sensitivity(med.id.as_str(), rng.gen_range(0.0..1.0));
            }
            patient.add_pathogene(builder.build()?, rng.gen_range(0.0..1.0))?;
            next_pathogene_id += 1;
        }

        schedule.push(Administration {
            patient_id: patient.id().to_string(),
            medicament: formulary[rng.gen_range(0..formulary.len())].clone(),
            amount: rng.gen_range(0.2..1.0),
            at_step: 1,
            every: Some(DOSING_INTERVAL),
        });
        patients.push(patient);
    }

    Ok(Population { patients, schedule })
}
