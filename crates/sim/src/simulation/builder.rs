//! Builder pattern for creating simulations.
//!
//! Provides a fluent API for assembling a [`ModelConfig`] in code and turning
//! it into a validated [`Simulation`].

use super::config::{
    GenomeConfig, ModelConfig, PolymeraseConfig, ReactionConfig, RibosomeConfig, SpeciesConfig,
    TranscriptConfig,
};
use super::Simulation;
use crate::errors::SimulationError;

/// Builder for constructing Simulation instances with a fluent API.
///
/// # Examples
///
/// ```
/// use expressim_sim::simulation::{GenomeConfig, ModelBuilder};
///
/// let mut sim = ModelBuilder::new()
///     .seed(42)
///     .polymerase("rnapol", 10, 40.0, 10)
///     .ribosome(10, 30.0, 100)
///     .genome(
///         GenomeConfig::new("phage", 150)
///             .promoter("phi1", 1, 10, &[("rnapol", 2e8)])
///             .terminator("t1", 148, 149, &[("rnapol", 1.0)])
///             .gene("proteinX", 26, 121, 11, 26, 1e7),
///     )
///     .build()
///     .unwrap();
///
/// let records = sim.run(10.0, 1.0).unwrap();
/// assert!(!records.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    config: ModelConfig,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing model description.
    pub fn from_config(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Set the cell volume in liters (default: 8e-15).
    pub fn cell_volume(mut self, cell_volume: f64) -> Self {
        self.config.cell_volume = cell_volume;
        self
    }

    /// Set the random seed for reproducibility.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn species(mut self, name: &str, copy_number: i64) -> Self {
        self.config.species.push(SpeciesConfig {
            name: name.to_string(),
            copy_number,
        });
        self
    }

    pub fn reaction(mut self, rate_constant: f64, reactants: &[&str], products: &[&str]) -> Self {
        self.config.reactions.push(ReactionConfig {
            rate_constant,
            reactants: reactants.iter().map(|s| s.to_string()).collect(),
            products: products.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn polymerase(mut self, name: &str, footprint: u32, speed: f64, copy_number: i64) -> Self {
        self.config.polymerases.push(PolymeraseConfig {
            name: name.to_string(),
            footprint,
            speed,
            copy_number,
        });
        self
    }

    pub fn ribosome(mut self, footprint: u32, speed: f64, copy_number: i64) -> Self {
        self.config.ribosome = Some(RibosomeConfig {
            footprint,
            speed,
            copy_number,
        });
        self
    }

    pub fn genome(mut self, genome: GenomeConfig) -> Self {
        self.config.genomes.push(genome);
        self
    }

    pub fn transcript(mut self, transcript: TranscriptConfig) -> Self {
        self.config.transcripts.push(transcript);
        self
    }

    /// The model description assembled so far.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Validate the model and build the simulation.
    pub fn build(self) -> Result<Simulation, SimulationError> {
        Simulation::from_config(&self.config)
    }
}
