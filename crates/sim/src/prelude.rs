//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use expressim_sim::prelude::*;
//!
//! let mut sim = ModelBuilder::new()
//!     .seed(1)
//!     .species("a", 5)
//!     .reaction(1.0, &["a"], &["b"])
//!     .build()
//!     .unwrap();
//! sim.run(100.0, 10.0).unwrap();
//! assert_eq!(sim.count("b"), 5);
//! ```

pub use crate::errors::{self, ConfigError, PolymerError, ReactionError, SimulationError};
pub use crate::feature::{BindingSite, MobileElement, ReleaseSite};
pub use crate::polymer::{Genome, PolymerEvent, PolymerId, Transcript, TranscriptId};
pub use crate::simulation::{CountsRecord, GenomeConfig, ModelBuilder, ModelConfig, Simulation};
pub use crate::species::SpeciesTracker;
