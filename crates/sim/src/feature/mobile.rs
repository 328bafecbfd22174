//! Mobile elements: things that bind a polymer and move along it.
//!
//! Every mobile element occupies `[start, stop]`. How a step changes that
//! span depends on the element kind:
//!
//! - polymerases and ribosomes slide both edges forward;
//! - the mask recedes its start, exposing more of the polymer;
//! - an RNase extends its stop, eating the transcript behind it.

use super::{MASK, RNASE};
use std::collections::HashSet;

/// Movement policy and kind-specific state.
#[derive(Debug, Clone, PartialEq)]
pub enum MobileKind {
    Polymerase,
    Mask {
        /// Names of elements allowed to push the mask back.
        movers: HashSet<String>,
    },
    Rnase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobileElement {
    name: String,
    start: u32,
    stop: u32,
    footprint: u32,
    speed: f64,
    reading_frame: Option<u8>,
    kind: MobileKind,
}

impl MobileElement {
    /// A polymerase (or ribosome) that is not yet bound anywhere.
    pub fn polymerase(name: impl Into<String>, footprint: u32, speed: f64) -> Self {
        Self {
            name: name.into(),
            start: 0,
            stop: 0,
            footprint,
            speed,
            reading_frame: None,
            kind: MobileKind::Polymerase,
        }
    }

    pub fn rnase(footprint: u32, speed: f64) -> Self {
        Self {
            name: RNASE.to_string(),
            start: 0,
            stop: 0,
            footprint,
            speed,
            reading_frame: None,
            kind: MobileKind::Rnase,
        }
    }

    /// Mask over `[start, stop]`. A mask with `start > stop` covers nothing.
    pub fn mask<I, S>(start: u32, stop: u32, movers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: MASK.to_string(),
            start,
            stop,
            footprint: (stop + 1).saturating_sub(start),
            speed: 0.0,
            reading_frame: None,
            kind: MobileKind::Mask {
                movers: movers.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn stop(&self) -> u32 {
        self.stop
    }

    pub fn footprint(&self) -> u32 {
        self.footprint
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_rnase(&self) -> bool {
        matches!(self.kind, MobileKind::Rnase)
    }

    pub fn reading_frame(&self) -> Option<u8> {
        self.reading_frame
    }

    pub fn set_reading_frame(&mut self, reading_frame: Option<u8>) {
        self.reading_frame = reading_frame;
    }

    /// Place the element so that its footprint starts at `start`.
    pub fn place_at(&mut self, start: u32) {
        self.start = start;
        self.stop = start + self.footprint.max(1) - 1;
    }

    /// Is there still anything under this (mask) element?
    pub fn is_empty(&self) -> bool {
        self.start > self.stop
    }

    /// Is `name` allowed to push this mask back? Always false for
    /// non-mask elements.
    pub fn check_interaction(&self, name: &str) -> bool {
        match &self.kind {
            MobileKind::Mask { movers } => movers.contains(name),
            _ => false,
        }
    }

    /// Take one step.
    #[inline]
    pub fn advance(&mut self) {
        match self.kind {
            MobileKind::Polymerase => {
                self.start += 1;
                self.stop += 1;
            }
            MobileKind::Mask { .. } => self.start += 1,
            MobileKind::Rnase => self.stop += 1,
        }
    }

    /// Undo exactly one `advance`.
    #[inline]
    pub fn move_back(&mut self) {
        match self.kind {
            MobileKind::Polymerase => {
                self.start -= 1;
                self.stop -= 1;
            }
            MobileKind::Mask { .. } => self.start -= 1,
            MobileKind::Rnase => self.stop -= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polymerase_moves_both_edges() {
        let mut pol = MobileElement::polymerase("rnapol", 10, 40.0);
        pol.place_at(5);
        assert_eq!((pol.start(), pol.stop()), (5, 14));
        pol.advance();
        assert_eq!((pol.start(), pol.stop()), (6, 15));
        pol.move_back();
        assert_eq!((pol.start(), pol.stop()), (5, 14));
    }

    #[test]
    fn test_mask_recedes_start() {
        let mut mask = MobileElement::mask(10, 100, ["rnapol"]);
        mask.advance();
        assert_eq!((mask.start(), mask.stop()), (11, 100));
        mask.move_back();
        assert_eq!(mask.start(), 10);
        assert!(mask.check_interaction("rnapol"));
        assert!(!mask.check_interaction("ribosome"));
    }

    #[test]
    fn test_empty_mask() {
        let mask = MobileElement::mask(101, 100, Vec::<String>::new());
        assert!(mask.is_empty());
        assert_eq!(mask.footprint(), 0);
    }

    #[test]
    fn test_rnase_extends_stop() {
        let mut rnase = MobileElement::rnase(10, 20.0);
        rnase.place_at(2);
        rnase.advance();
        rnase.advance();
        assert_eq!((rnase.start(), rnase.stop()), (2, 13));
        rnase.move_back();
        assert_eq!(rnase.stop(), 12);
        assert!(rnase.is_rnase());
        assert!(!rnase.check_interaction("rnapol"));
    }
}
