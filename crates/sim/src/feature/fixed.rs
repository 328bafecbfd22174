//! Fixed features: sites at a set position on a polymer.
//!
//! Binding sites (promoters, ribosome binding sites, RNase sites) are where
//! mobile elements attach; release sites (terminators, stop codons) are where
//! they may detach. Both share a covering counter that records how many
//! things currently sit on top of the site, plus a snapshot of that counter
//! used to detect covered/uncovered transitions within one step.

use super::{RIBOSOME, RNASE, STOP_CODON};
use std::collections::HashMap;

/// What a binding site is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRole {
    /// Polymerase entry point on a genome.
    Promoter,
    /// Ribosome entry point on a transcript.
    Rbs,
    /// RNase entry point on a transcript.
    RnaseSite,
}

/// State specific to binding sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    role: SiteRole,
    first_exposure: bool,
}

/// State specific to release sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    readthrough: bool,
}

/// A site at a fixed position on a polymer.
///
/// `Clone` is a full deep copy: the clone's covering counters and flags are
/// independent of the source site's from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedElement<K> {
    name: String,
    start: u32,
    stop: u32,
    /// Mobile element name -> binding rate (binding sites) or termination
    /// efficiency (release sites).
    interactions: HashMap<String, f64>,
    /// Gene reported to the species tracker for this site.
    gene: String,
    covered: u32,
    old_covered: u32,
    reading_frame: Option<u8>,
    kind: K,
}

pub type BindingSite = FixedElement<Binding>;
pub type ReleaseSite = FixedElement<Release>;

impl<K> FixedElement<K> {
    fn with_kind(
        name: impl Into<String>,
        start: u32,
        stop: u32,
        interactions: HashMap<String, f64>,
        kind: K,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
            interactions,
            gene: String::new(),
            covered: 0,
            old_covered: 0,
            reading_frame: None,
            kind,
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

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn set_gene(&mut self, gene: impl Into<String>) {
        self.gene = gene.into();
    }

    pub fn reading_frame(&self) -> Option<u8> {
        self.reading_frame
    }

    pub fn set_reading_frame(&mut self, reading_frame: Option<u8>) {
        self.reading_frame = reading_frame;
    }

    pub fn interactions(&self) -> &HashMap<String, f64> {
        &self.interactions
    }

    /// Registered rate for a mobile element, if any.
    pub fn interaction(&self, name: &str) -> Option<f64> {
        self.interactions.get(name).copied()
    }

    /// Cover this site. Sites may be covered by several things at once.
    #[inline]
    pub fn cover(&mut self) {
        self.covered += 1;
    }

    /// Remove one covering. Never drops below zero.
    #[inline]
    pub fn uncover(&mut self) {
        self.covered = self.covered.saturating_sub(1);
    }

    #[inline]
    pub fn is_covered(&self) -> bool {
        self.covered > 0
    }

    pub fn covered(&self) -> u32 {
        self.covered
    }

    /// Snapshot the covering counter. Call once after the cover/uncover
    /// calls of a step so transitions are reported for that step only.
    #[inline]
    pub fn reset_state(&mut self) {
        self.old_covered = self.covered;
    }

    /// Went from covered to free since the last snapshot.
    #[inline]
    pub fn was_uncovered(&self) -> bool {
        self.old_covered >= 1 && self.covered == 0
    }

    /// Went from free to covered since the last snapshot.
    #[inline]
    pub fn was_covered(&self) -> bool {
        self.old_covered == 0 && self.covered > 0
    }
}

impl BindingSite {
    pub fn new(
        name: impl Into<String>,
        start: u32,
        stop: u32,
        interactions: HashMap<String, f64>,
        role: SiteRole,
    ) -> Self {
        Self::with_kind(
            name,
            start,
            stop,
            interactions,
            Binding {
                role,
                first_exposure: false,
            },
        )
    }

    pub fn promoter(
        name: impl Into<String>,
        start: u32,
        stop: u32,
        interactions: HashMap<String, f64>,
    ) -> Self {
        Self::new(name, start, stop, interactions, SiteRole::Promoter)
    }

    /// Ribosome binding site for `gene`, named `<gene>_rbs`.
    pub fn rbs(gene: &str, start: u32, stop: u32, strength: f64) -> Self {
        let interactions = HashMap::from([(RIBOSOME.to_string(), strength)]);
        let mut site = Self::new(format!("{gene}_rbs"), start, stop, interactions, SiteRole::Rbs);
        site.set_gene(gene);
        site
    }

    /// Site where RNases may start degrading a transcript.
    pub fn rnase_site(name: impl Into<String>, start: u32, stop: u32, rate: f64) -> Self {
        let interactions = HashMap::from([(RNASE.to_string(), rate)]);
        Self::new(name, start, stop, interactions, SiteRole::RnaseSite)
    }

    pub fn role(&self) -> SiteRole {
        self.kind.role
    }

    /// Does the mobile element `name` have a registered binding rate here?
    pub fn check_interaction(&self, name: &str) -> bool {
        self.interactions.contains_key(name)
    }

    pub fn first_exposure(&self) -> bool {
        self.kind.first_exposure
    }

    pub fn set_first_exposure(&mut self, first_exposure: bool) {
        self.kind.first_exposure = first_exposure;
    }
}

impl ReleaseSite {
    pub fn new(
        name: impl Into<String>,
        start: u32,
        stop: u32,
        efficiencies: HashMap<String, f64>,
    ) -> Self {
        Self::with_kind(name, start, stop, efficiencies, Release { readthrough: false })
    }

    /// In-frame stop codon of `gene`, recognized by ribosomes only.
    pub fn stop_codon(gene: &str, start: u32, stop: u32, reading_frame: u8) -> Self {
        let interactions = HashMap::from([(RIBOSOME.to_string(), 1.0)]);
        let mut site = Self::new(STOP_CODON, start, stop, interactions);
        site.set_gene(gene);
        site.set_reading_frame(Some(reading_frame));
        site
    }

    /// Does `name` interact with this site while moving in `reading_frame`?
    pub fn check_interaction(&self, name: &str, reading_frame: Option<u8>) -> bool {
        self.interactions.contains_key(name) && self.reading_frame == reading_frame
    }

    /// Termination efficiency for `name`; zero if none is registered.
    pub fn efficiency(&self, name: &str) -> f64 {
        self.interaction(name).unwrap_or(0.0)
    }

    pub fn readthrough(&self) -> bool {
        self.kind.readthrough
    }

    pub fn set_readthrough(&mut self, readthrough: bool) {
        self.kind.readthrough = readthrough;
    }
}
