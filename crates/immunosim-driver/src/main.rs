//! Immunosim binary
//!
//! Seeds a population, runs the configured number of steps, and prints the
//! final patient snapshots as JSON.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use immunosim_driver::{seed_population, Simulation, SimulationConfig};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Immunosim v{}", immunosim_common::VERSION);

    // Load configuration
    let config = SimulationConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let population = seed_population(config.patients, config.seed)?;
    let mut simulation = Simulation::from_config(&config);
    for patient in population.patients {
        simulation.add_patient(patient)?;
    }
    for administration in population.schedule {
        simulation.schedule(administration)?;
    }

    let reports = simulation.run(config.steps);
    let cleared: usize = reports
        .iter()
        .flat_map(|r| &r.patients)
        .map(|p| p.cleared.len())
        .sum();
    let skipped: usize = reports.iter().map(|r| r.skipped.len()).sum();
    info!(
        "Finished {} steps: {} infections cleared, {} patient-steps skipped",
        reports.len(),
        cleared,
        skipped
    );

    for snapshot in simulation.snapshots() {
        info!("{}", snapshot);
    }
    println!("{}", simulation.snapshots_json()?);

    Ok(())
}
