//! Polymers and the mobile elements moving along them.
//!
//! A [`Polymer`] owns its fixed features, its mask and the mobile elements
//! bound to it, and runs the per-step movement, collision, termination and
//! coverage algorithm. [`Genome`] adds transcript spawning on top of it;
//! [`Transcript`] adds reading-frame assignment at initiation.
//!
//! Polymers never hold references to each other. A polymerase transcribing a
//! genome refers to the transcript it is synthesizing through a
//! [`TranscriptId`] into the driver's transcript arena, and the genome
//! forwards mask shifts to that arena after each step.

mod genome;
mod manager;
#[allow(clippy::module_inception)]
mod polymer;
mod transcript;

pub use genome::{Degradation, Genome};
pub use manager::{BoundElement, MobileElementManager};
pub use polymer::Polymer;
pub use transcript::Transcript;

use crate::species::SpeciesTracker;
use std::fmt;

/// Index of a transcript in the driver's transcript arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranscriptId(pub usize);

/// Identity of a polymer known to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolymerId {
    Genome(usize),
    Transcript(usize),
}

impl fmt::Display for PolymerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Genome(i) => write!(f, "genome[{i}]"),
            Self::Transcript(i) => write!(f, "transcript[{i}]"),
        }
    }
}

/// Events produced by polymers for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum PolymerEvent {
    /// A mobile element left its polymer. `gene` is the release site's gene,
    /// or [`crate::feature::RUNOFF_GENE`] if it ran off the end.
    Termination {
        polymer: PolymerId,
        element: String,
        gene: String,
    },
    /// A genome spawned a new transcript.
    TranscriptCreated {
        parent: PolymerId,
        transcript: TranscriptId,
    },
}

/// What a single movement attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Collided with a neighbor or the mask and was moved back.
    Blocked,
    /// Advanced one step.
    Moved,
    /// Left the polymer.
    Terminated,
}

/// Result of a movement step, including the mask shift owed to the
/// transcript attached to the moved element, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub outcome: MoveOutcome,
    pub shift_child: Option<(TranscriptId, u32)>,
}

impl Step {
    pub fn blocked() -> Self {
        Self {
            outcome: MoveOutcome::Blocked,
            shift_child: None,
        }
    }
}

/// Everything a polymer step needs from the driver: the species registry,
/// the random source and the event queue.
pub struct Context<'a, R: ?Sized> {
    pub tracker: &'a mut SpeciesTracker,
    pub rng: &'a mut R,
    pub events: &'a mut Vec<PolymerEvent>,
}

impl<'a, R: ?Sized> Context<'a, R> {
    pub fn new(
        tracker: &'a mut SpeciesTracker,
        rng: &'a mut R,
        events: &'a mut Vec<PolymerEvent>,
    ) -> Self {
        Self {
            tracker,
            rng,
            events,
        }
    }
}
