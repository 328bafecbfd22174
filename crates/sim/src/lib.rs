//! # Simulation Crate
//!
//! The `sim` crate provides a nucleotide-resolution stochastic simulator of
//! gene expression. Polymerases and ribosomes bind, move along and detach
//! from genomes and transcripts, and every such event feeds a discrete-event
//! chemical reaction network driven by Gillespie's algorithm.

pub mod base;
pub mod errors;
pub mod feature;
pub mod polymer;
pub mod simulation;
pub mod species;
pub mod prelude;

pub use polymer::{Genome, Polymer, Transcript};
pub use simulation::{ModelBuilder, Simulation};
