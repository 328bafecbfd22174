use super::TranscriptId;
use crate::base::weighted_index;
use crate::errors::PolymerError;
use crate::feature::MobileElement;
use rand::Rng;

/// A mobile element bound to a polymer, with the transcript it is
/// synthesizing (polymerases on a genome only).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundElement {
    pub element: MobileElement,
    pub attached: Option<TranscriptId>,
}

/// Mobile elements bound to one polymer, kept sorted by start position, with
/// a parallel list of movement propensities and their cached sum.
///
/// The propensity of an element is `weight[stop - 1] * speed`, so it changes
/// every time the element moves.
#[derive(Debug, Clone)]
pub struct MobileElementManager {
    polymer: String,
    weights: Vec<f64>,
    elements: Vec<BoundElement>,
    propensities: Vec<f64>,
    prop_sum: f64,
}

impl MobileElementManager {
    pub fn new(polymer: impl Into<String>, weights: Vec<f64>) -> Self {
        Self {
            polymer: polymer.into(),
            weights,
            elements: Vec::new(),
            propensities: Vec::new(),
            prop_sum: 0.0,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replace the weight profile and recompute every cached propensity.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<(), PolymerError> {
        let old = std::mem::replace(&mut self.weights, weights);
        for index in 0..self.elements.len() {
            if let Err(e) = self.update_propensity(index) {
                self.weights = old;
                return Err(e);
            }
        }
        Ok(())
    }

    fn propensity_of(&self, element: &MobileElement) -> Result<f64, PolymerError> {
        let position = element.stop();
        let weight = position
            .checked_sub(1)
            .and_then(|i| self.weights.get(i as usize))
            .ok_or_else(|| PolymerError::WeightOutOfBounds {
                polymer: self.polymer.clone(),
                position,
                len: self.weights.len(),
            })?;
        Ok(weight * element.speed())
    }

    fn check_lengths(&self) -> Result<(), PolymerError> {
        if self.elements.len() != self.propensities.len() {
            return Err(PolymerError::PropensityMismatch {
                polymer: self.polymer.clone(),
                elements: self.elements.len(),
                propensities: self.propensities.len(),
            });
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> PolymerError {
        PolymerError::IndexOutOfRange {
            polymer: self.polymer.clone(),
            index,
            len: self.elements.len(),
        }
    }

    /// Insert an element after every bound element with the same or a lower
    /// start position. Returns the index it was inserted at.
    pub fn insert(
        &mut self,
        element: MobileElement,
        attached: Option<TranscriptId>,
    ) -> Result<usize, PolymerError> {
        let propensity = self.propensity_of(&element)?;
        let index = self
            .elements
            .partition_point(|b| b.element.start() <= element.start());
        self.elements.insert(index, BoundElement { element, attached });
        self.propensities.insert(index, propensity);
        self.prop_sum += propensity;
        self.check_lengths()?;
        Ok(index)
    }

    /// Remove and return the element at `index`.
    pub fn delete(&mut self, index: usize) -> Result<BoundElement, PolymerError> {
        if index >= self.elements.len() {
            return Err(self.out_of_range(index));
        }
        let bound = self.elements.remove(index);
        let propensity = self.propensities.remove(index);
        self.prop_sum -= propensity;
        if self.elements.is_empty() {
            // Drop accumulated rounding error.
            self.prop_sum = 0.0;
        }
        self.check_lengths()?;
        Ok(bound)
    }

    /// Recompute the propensity of the element at `index` after it moved.
    pub fn update_propensity(&mut self, index: usize) -> Result<(), PolymerError> {
        let element = &self.get(index)?.element;
        let propensity = self.propensity_of(element)?;
        self.prop_sum += propensity - self.propensities[index];
        self.propensities[index] = propensity;
        Ok(())
    }

    /// Draw the index of the next element to move, weighted by propensity.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize, PolymerError> {
        if self.propensities.is_empty() {
            return Err(PolymerError::NoActiveElements {
                polymer: self.polymer.clone(),
                prop_sum: self.prop_sum,
            });
        }
        let index = weighted_index(&self.propensities, rng).ok_or_else(|| {
            PolymerError::NoActiveElements {
                polymer: self.polymer.clone(),
                prop_sum: self.prop_sum,
            }
        })?;
        if index >= self.elements.len() {
            return Err(self.out_of_range(index));
        }
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Result<&BoundElement, PolymerError> {
        self.elements
            .get(index)
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut MobileElement, PolymerError> {
        let len = self.elements.len();
        match self.elements.get_mut(index) {
            Some(bound) => Ok(&mut bound.element),
            None => Err(PolymerError::IndexOutOfRange {
                polymer: self.polymer.clone(),
                index,
                len,
            }),
        }
    }

    pub fn attached(&self, index: usize) -> Result<Option<TranscriptId>, PolymerError> {
        Ok(self.get(index)?.attached)
    }

    pub fn valid_index(&self, index: usize) -> bool {
        index < self.elements.len()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn prop_sum(&self) -> f64 {
        self.prop_sum
    }

    pub fn propensities(&self) -> &[f64] {
        &self.propensities
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundElement> {
        self.elements.iter()
    }
}
