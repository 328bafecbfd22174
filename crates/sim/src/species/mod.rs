//! Species counts and the elementary reactions between species.

mod reaction;
mod tracker;

pub use reaction::{mesoscopic, SpeciesReaction, AVOGADRO, DEFAULT_CELL_VOLUME};
pub use tracker::SpeciesTracker;

/// Handle of a reaction owned by the simulation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionId(pub usize);
