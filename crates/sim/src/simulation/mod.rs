//! Simulation driver, model configuration and builder.
//!
//! - `Simulation`: the Gillespie engine that owns the species tracker, the
//!   reactions, the genomes and the transcript arena.
//! - `ModelConfig`: serializable model description.
//! - `ModelBuilder`: fluent builder for constructing `Simulation` instances
//!   with validation.

pub mod builder;
pub mod config;
pub mod engine;

pub use builder::ModelBuilder;
pub use config::{
    DegradationConfig, GeneConfig, GenomeConfig, MaskConfig, ModelConfig, PolymeraseConfig,
    PromoterConfig, ReactionConfig, RibosomeConfig, RnaseSiteConfig, SpeciesConfig,
    TerminatorConfig, TranscriptConfig,
};
pub use engine::{BindReaction, CountsRecord, Reaction, Simulation};
