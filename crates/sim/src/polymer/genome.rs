use super::{Context, Polymer, PolymerEvent, PolymerId, Step, Transcript, TranscriptId};
use crate::base::{Interval, IntervalTree};
use crate::errors::PolymerError;
use crate::feature::{
    BindingSite, MobileElement, ReleaseSite, RIBOSOME, RNASE, RNASE_SITE, RNASE_SITE_INTERNAL,
};
use crate::species::SpeciesTracker;
use rand::Rng;
use std::collections::BTreeMap;

/// Transcript degradation settings of a genome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degradation {
    /// Binding rate of RNases to the 5' end of a new transcript.
    pub rate: f64,
    pub rnase_speed: f64,
    pub rnase_footprint: u32,
}

/// A genome: a polymer transcribed by polymerases, plus the templates of
/// everything its transcripts will carry.
///
/// Every time a polymerase binds a promoter, the genome builds a fresh
/// [`Transcript`] from deep copies of the templates lying downstream of the
/// polymerase and hands it to the driver's transcript arena. As the
/// polymerase moves, the transcript's mask recedes behind it.
#[derive(Debug, Clone)]
pub struct Genome {
    polymer: Polymer,
    transcript_binding: Vec<BindingSite>,
    transcript_release: Vec<ReleaseSite>,
    binding_index: IntervalTree<usize>,
    release_index: IntervalTree<usize>,
    transcript_weights: Vec<f64>,
    degradation: Option<Degradation>,
    /// Binding-site name -> mobile element name -> binding rate.
    bindings: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Genome {
    pub fn new(name: impl Into<String>, length: u32) -> Self {
        Self {
            polymer: Polymer::new(PolymerId::Genome(0), name, 1, length),
            transcript_binding: Vec::new(),
            transcript_release: Vec::new(),
            binding_index: IntervalTree::default(),
            release_index: IntervalTree::default(),
            transcript_weights: vec![1.0; length as usize],
            degradation: None,
            bindings: BTreeMap::new(),
        }
    }

    /// Make spawned transcripts degradable by RNases entering at their 5' end.
    pub fn with_degradation(mut self, rate: f64, rnase_speed: f64, rnase_footprint: u32) -> Self {
        self.degradation = Some(Degradation {
            rate,
            rnase_speed,
            rnase_footprint,
        });
        self.bindings.insert(
            RNASE_SITE.to_string(),
            BTreeMap::from([(RNASE.to_string(), rate)]),
        );
        self
    }

    pub fn polymer(&self) -> &Polymer {
        &self.polymer
    }

    pub fn name(&self) -> &str {
        self.polymer.name()
    }

    pub fn degradation(&self) -> Option<Degradation> {
        self.degradation
    }

    pub fn bindings(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.bindings
    }

    pub fn transcript_weights(&self) -> &[f64] {
        &self.transcript_weights
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.polymer.set_id(PolymerId::Genome(index));
    }

    /// Mask `[start, genome stop]`, pushable only by `movers`.
    pub fn add_mask<I, S>(&mut self, start: u32, movers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop = self.polymer.stop();
        self.polymer.set_mask(MobileElement::mask(start, stop, movers));
    }

    pub fn add_promoter(
        &mut self,
        name: &str,
        start: u32,
        stop: u32,
        interactions: BTreeMap<String, f64>,
    ) {
        let rates = interactions.clone().into_iter().collect();
        let site = BindingSite::promoter(name, start, stop, rates);
        self.polymer.add_binding_site(site);
        self.bindings.insert(name.to_string(), interactions);
    }

    pub fn add_terminator(
        &mut self,
        name: &str,
        start: u32,
        stop: u32,
        efficiencies: BTreeMap<String, f64>,
    ) {
        let site = ReleaseSite::new(name, start, stop, efficiencies.into_iter().collect());
        self.polymer.add_release_site(site);
    }

    /// Register a gene: a ribosome binding site and an in-frame stop codon
    /// covering the last two positions of the gene.
    pub fn add_gene(
        &mut self,
        name: &str,
        start: u32,
        stop: u32,
        rbs_start: u32,
        rbs_stop: u32,
        rbs_strength: f64,
    ) {
        let rbs = BindingSite::rbs(name, rbs_start, rbs_stop, rbs_strength);
        self.bindings.insert(
            rbs.name().to_string(),
            BTreeMap::from([(RIBOSOME.to_string(), rbs_strength)]),
        );
        self.transcript_binding.push(rbs);
        let frame = (start % 3) as u8;
        self.transcript_release
            .push(ReleaseSite::stop_codon(name, stop.saturating_sub(1), stop, frame));
    }

    /// Internal RNase entry site copied into every transcript covering it.
    pub fn add_rnase_site(&mut self, start: u32, stop: u32, rate: f64) {
        self.transcript_binding
            .push(BindingSite::rnase_site(RNASE_SITE_INTERNAL, start, stop, rate));
        self.bindings.insert(
            RNASE_SITE_INTERNAL.to_string(),
            BTreeMap::from([(RNASE.to_string(), rate)]),
        );
    }

    /// Set the per-position speed weights handed to new transcripts.
    pub fn add_weights(&mut self, weights: Vec<f64>) -> Result<(), PolymerError> {
        let expected = self.polymer.stop() as usize;
        if weights.len() != expected {
            return Err(PolymerError::WeightLength {
                polymer: self.polymer.name().to_string(),
                expected,
                actual: weights.len(),
            });
        }
        self.transcript_weights = weights;
        Ok(())
    }

    pub fn initialize(&mut self, tracker: &mut SpeciesTracker) -> Result<(), PolymerError> {
        self.polymer.initialize(tracker)?;
        self.binding_index = self
            .transcript_binding
            .iter()
            .enumerate()
            .map(|(i, site)| Interval::new(site.start(), site.stop(), i))
            .collect();
        self.release_index = self
            .transcript_release
            .iter()
            .enumerate()
            .map(|(i, site)| Interval::new(site.start(), site.stop(), i))
            .collect();
        Ok(())
    }

    /// Build an unregistered transcript over `[start, stop]` carrying fresh
    /// copies of every template fully inside that range, masked end to end.
    pub fn build_transcript(&self, start: u32, stop: u32) -> Transcript {
        let mut binding: Vec<BindingSite> = self
            .binding_index
            .find_contained(start, stop)
            .into_iter()
            .map(|interval| self.transcript_binding[interval.value].clone())
            .collect();
        if let Some(degradation) = self.degradation {
            binding.push(BindingSite::rnase_site(
                RNASE_SITE,
                start + 1,
                start + 11,
                degradation.rate,
            ));
        }
        let release: Vec<ReleaseSite> = self
            .release_index
            .find_contained(start, stop)
            .into_iter()
            .map(|interval| self.transcript_release[interval.value].clone())
            .collect();

        Transcript::from_parts(
            "rna",
            start,
            stop,
            binding,
            release,
            MobileElement::mask(start, stop, std::iter::empty::<String>()),
            self.transcript_weights.clone(),
        )
    }

    /// Bind a polymerase to a promoter and start the transcript it will
    /// synthesize. The transcript is appended to `transcripts`.
    pub fn bind<R: Rng + ?Sized>(
        &mut self,
        mut element: MobileElement,
        site_name: &str,
        ctx: &mut Context<'_, R>,
        transcripts: &mut Vec<Transcript>,
    ) -> Result<TranscriptId, PolymerError> {
        self.polymer.place(&mut element, site_name, ctx)?;
        let id = TranscriptId(transcripts.len());
        let start = element.stop();
        self.polymer.attach(element, Some(id))?;

        let mut transcript = self.build_transcript(start, self.polymer.stop());
        transcript.set_index(id);
        transcript.initialize(ctx.tracker)?;
        transcripts.push(transcript);
        ctx.events.push(PolymerEvent::TranscriptCreated {
            parent: self.polymer.id(),
            transcript: id,
        });
        log::debug!(
            "[Transcript] {} started transcript {} at {start}",
            self.polymer.name(),
            id.0
        );
        Ok(id)
    }

    /// Move one polymerase and recede the mask of its transcript.
    pub fn execute<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, R>,
        transcripts: &mut [Transcript],
    ) -> Result<Step, PolymerError> {
        let step = self.polymer.execute(ctx)?;
        self.forward(step, ctx.tracker, transcripts)?;
        Ok(step)
    }

    pub fn move_element<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        ctx: &mut Context<'_, R>,
        transcripts: &mut [Transcript],
    ) -> Result<Step, PolymerError> {
        let step = self.polymer.move_element(index, ctx)?;
        self.forward(step, ctx.tracker, transcripts)?;
        Ok(step)
    }

    fn forward(
        &self,
        step: Step,
        tracker: &mut SpeciesTracker,
        transcripts: &mut [Transcript],
    ) -> Result<(), PolymerError> {
        let Some((id, n)) = step.shift_child else {
            return Ok(());
        };
        let transcript = transcripts
            .get_mut(id.0)
            .ok_or_else(|| PolymerError::UnknownTranscript {
                polymer: self.polymer.name().to_string(),
                transcript: id.0,
            })?;
        transcript.shift_mask_by(n, tracker)
    }
}
