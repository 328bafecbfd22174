use super::{Context, Polymer, PolymerId, Step, TranscriptId};
use crate::errors::PolymerError;
use crate::feature::{BindingSite, MobileElement, ReleaseSite};
use crate::species::SpeciesTracker;
use rand::Rng;

/// An RNA polymer translated by ribosomes.
///
/// Ribosomes take their reading frame from the position they bind at, and
/// only terminate at stop codons in that frame.
#[derive(Debug, Clone)]
pub struct Transcript {
    polymer: Polymer,
}

impl Transcript {
    /// A standalone transcript over `[1, length]`, fully accessible.
    pub fn new(name: impl Into<String>, length: u32) -> Self {
        Self {
            polymer: Polymer::new(PolymerId::Transcript(0), name, 1, length),
        }
    }

    pub(crate) fn from_parts(
        name: &str,
        start: u32,
        stop: u32,
        binding_sites: Vec<BindingSite>,
        release_sites: Vec<ReleaseSite>,
        mask: MobileElement,
        weights: Vec<f64>,
    ) -> Self {
        let mut polymer =
            Polymer::with_weights(PolymerId::Transcript(0), name, start, stop, weights);
        for site in binding_sites {
            polymer.add_binding_site(site);
        }
        for site in release_sites {
            polymer.add_release_site(site);
        }
        polymer.set_mask(mask);
        Self { polymer }
    }

    pub fn polymer(&self) -> &Polymer {
        &self.polymer
    }

    pub(crate) fn set_index(&mut self, id: TranscriptId) {
        self.polymer.set_id(PolymerId::Transcript(id.0));
    }

    pub fn add_gene(
        &mut self,
        name: &str,
        start: u32,
        stop: u32,
        rbs_start: u32,
        rbs_stop: u32,
        rbs_strength: f64,
    ) {
        self.polymer
            .add_binding_site(BindingSite::rbs(name, rbs_start, rbs_stop, rbs_strength));
        let frame = (start % 3) as u8;
        self.polymer
            .add_release_site(ReleaseSite::stop_codon(name, stop.saturating_sub(1), stop, frame));
    }

    pub fn add_weights(&mut self, weights: Vec<f64>) -> Result<(), PolymerError> {
        self.polymer.set_weights(weights)
    }

    pub fn initialize(&mut self, tracker: &mut SpeciesTracker) -> Result<(), PolymerError> {
        self.polymer.initialize(tracker)
    }

    /// Bind a ribosome (or RNase), fixing its reading frame at the
    /// binding position.
    pub fn bind<R: Rng + ?Sized>(
        &mut self,
        mut element: MobileElement,
        site_name: &str,
        ctx: &mut Context<'_, R>,
    ) -> Result<(), PolymerError> {
        self.polymer.place(&mut element, site_name, ctx)?;
        element.set_reading_frame(Some((element.start() % 3) as u8));
        self.polymer.attach(element, None)?;
        Ok(())
    }

    pub fn execute<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, R>,
    ) -> Result<Step, PolymerError> {
        self.polymer.execute(ctx)
    }

    pub fn shift_mask_by(
        &mut self,
        n: u32,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        self.polymer.shift_mask_by(n, tracker)
    }
}
