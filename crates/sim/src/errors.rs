//! Error types for the expression engine and the simulation driver.
//!
//! Engine failures fall into two classes. Invariant violations mean internal
//! state is corrupted (or the model itself is inconsistent in a way that
//! should be structurally impossible); request errors mean a caller asked for
//! something the current state cannot satisfy. Both abort the current run.

use thiserror::Error;

/// Errors raised by polymers, their fixed features and bound mobile elements.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolymerError {
    /// The bound-element list and the propensity list diverged in length.
    #[error("Polymer {polymer} has {propensities} propensities for {elements} bound elements")]
    PropensityMismatch {
        polymer: String,
        elements: usize,
        propensities: usize,
    },

    /// A bound-element index was outside the manager's range.
    #[error("Mobile element index {index} out of range on polymer {polymer} (bound = {len})")]
    IndexOutOfRange {
        polymer: String,
        index: usize,
        len: usize,
    },

    /// Two mobile elements overlap by more than one position.
    #[error(
        "{element} (start: {start}, stop: {stop}) is overlapping {other} \
         (start: {other_start}, stop: {other_stop}) by more than one position on polymer {polymer}"
    )]
    ElementOverlap {
        polymer: String,
        element: String,
        start: u32,
        stop: u32,
        other: String,
        other_start: u32,
        other_stop: u32,
    },

    /// A mobile element overlaps the mask by more than one position.
    #[error("{element} is overlapping the mask by more than one position on polymer {polymer}")]
    MaskOverlap { polymer: String, element: String },

    /// Speed weight lookup outside the weight profile.
    #[error("No weight for position {position} on polymer {polymer} (profile length = {len})")]
    WeightOutOfBounds {
        polymer: String,
        position: u32,
        len: usize,
    },

    /// The cached count of uncovered sites would drop below zero.
    #[error("Cached count of uncovered site {species} on polymer {polymer} cannot be negative")]
    NegativeUncovered { polymer: String, species: String },

    /// A bound element references a transcript that is not in the arena.
    #[error("Polymer {polymer} references unknown transcript {transcript}")]
    UnknownTranscript { polymer: String, transcript: usize },

    /// No free, unmasked binding site with the requested name.
    #[error("{element} could not find free site {site} to bind on polymer {polymer}")]
    NoFreeSite {
        polymer: String,
        element: String,
        site: String,
    },

    /// Every free site with the requested name lies too close to a bound
    /// element to fit the new footprint.
    #[error("{element} does not fit on any free site {site} of polymer {polymer}")]
    SiteBlocked {
        polymer: String,
        element: String,
        site: String,
    },

    /// The chosen binding site has no interaction rate for the element.
    #[error("{element} does not interact with site {site}")]
    NoInteraction { element: String, site: String },

    /// Binding would place the element on top of the mask.
    #[error("{element} would overlap the mask upon binding site {site} on polymer {polymer}")]
    MaskOverlapOnBind {
        polymer: String,
        element: String,
        site: String,
    },

    /// A weight profile does not match the polymer length.
    #[error("Wrong weight count for polymer {polymer}: expected {expected}, got {actual}")]
    WeightLength {
        polymer: String,
        expected: usize,
        actual: usize,
    },

    /// A step was requested on a polymer whose total propensity is zero.
    #[error("Attempting to execute polymer {polymer} with reaction propensity of 0")]
    ZeroPropensity { polymer: String },

    /// A weighted draw was requested with no bound elements.
    #[error("No active mobile elements on polymer {polymer} (propensity sum: {prop_sum})")]
    NoActiveElements { polymer: String, prop_sum: f64 },
}

impl PolymerError {
    /// Whether this error signals corrupted internal state rather than a bad
    /// request or configuration.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::PropensityMismatch { .. }
                | Self::IndexOutOfRange { .. }
                | Self::ElementOverlap { .. }
                | Self::MaskOverlap { .. }
                | Self::WeightOutOfBounds { .. }
                | Self::NegativeUncovered { .. }
                | Self::UnknownTranscript { .. }
        )
    }
}

/// Errors raised when defining species reactions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactionError {
    #[error("Reactions with more than two reactant species are not supported (got {0})")]
    TooManyReactants(usize),
}

/// Errors raised while validating or parsing a model description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown polymerase {0} referenced by a binding site")]
    UnknownPolymerase(String),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced by the simulation driver.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Polymer(#[from] PolymerError),

    #[error(transparent)]
    Reaction(#[from] ReactionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Simulation has no remaining propensity at time {0}")]
    Exhausted(f64),
}
