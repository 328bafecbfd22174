use super::SpeciesTracker;
use crate::errors::ReactionError;

/// Avogadro's number (1/mol).
pub const AVOGADRO: f64 = 6.0221409e23;
/// Default cell volume in liters.
pub const DEFAULT_CELL_VOLUME: f64 = 8e-15;

/// Convert a macroscopic bimolecular rate constant to its mesoscopic value
/// for a cell of the given volume.
#[inline]
pub fn mesoscopic(rate_constant: f64, cell_volume: f64) -> f64 {
    rate_constant / (AVOGADRO * cell_volume)
}

/// Elementary mass-action reaction over at most two reactant species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesReaction {
    /// Mesoscopic rate constant.
    rate_constant: f64,
    reactants: Vec<String>,
    products: Vec<String>,
}

impl SpeciesReaction {
    /// Create a reaction from a macroscopic rate constant.
    ///
    /// # Errors
    /// Returns an error if more than two reactants are given.
    pub fn new(
        rate_constant: f64,
        reactants: Vec<String>,
        products: Vec<String>,
        cell_volume: f64,
    ) -> Result<Self, ReactionError> {
        if reactants.len() > 2 {
            return Err(ReactionError::TooManyReactants(reactants.len()));
        }
        let rate_constant = if reactants.len() == 2 {
            mesoscopic(rate_constant, cell_volume)
        } else {
            rate_constant
        };
        Ok(Self {
            rate_constant,
            reactants,
            products,
        })
    }

    pub fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    pub fn reactants(&self) -> &[String] {
        &self.reactants
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    /// Propensity from the current counts.
    pub fn propensity(&self, tracker: &SpeciesTracker) -> f64 {
        self.reactants
            .iter()
            .fold(self.rate_constant, |acc, r| acc * tracker.count(r) as f64)
    }

    /// Consume one of each reactant and produce one of each product.
    pub fn execute(&self, tracker: &mut SpeciesTracker) {
        for reactant in &self.reactants {
            tracker.increment(reactant, -1);
        }
        for product in &self.products {
            tracker.increment(product, 1);
        }
    }
}
