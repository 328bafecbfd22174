//! Registry of species counts and of who depends on them.
//!
//! One tracker exists per simulation run and is passed by reference to
//! every polymer and reaction that reads or changes a count. It only holds
//! ids of reactions and polymers, never the objects themselves.

use super::{ReactionId, SpeciesReaction};
use crate::polymer::PolymerId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
pub struct SpeciesTracker {
    /// Species name -> copy number.
    species: BTreeMap<String, i64>,
    /// Species name -> reactions whose propensity depends on it.
    dependents: BTreeMap<String, BTreeSet<ReactionId>>,
    /// Binding-site name -> polymers carrying a site with that name.
    polymers: BTreeMap<String, BTreeSet<PolymerId>>,
    /// Gene -> number of transcripts with an exposed ribosome binding site.
    transcripts: BTreeMap<String, i64>,
    /// Gene -> number of ribosomes that initiated translation.
    ribosomes: BTreeMap<String, i64>,
    /// Reactions whose propensity must be recomputed before the next draw.
    pending: BTreeSet<ReactionId>,
}

impl SpeciesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every reactant and product of `reaction` as a dependency of
    /// `id`, creating zero counts for species not seen before.
    pub fn register(&mut self, id: ReactionId, reaction: &SpeciesReaction) {
        for name in reaction.reactants().iter().chain(reaction.products()) {
            self.add_reaction(name, id);
            self.increment(name, 0);
        }
    }

    /// Record that reaction `id` depends on `species_name`.
    pub fn add_reaction(&mut self, species_name: &str, id: ReactionId) {
        self.dependents
            .entry(species_name.to_string())
            .or_default()
            .insert(id);
    }

    /// Record that `polymer` carries a binding site called `site_name`.
    pub fn add_polymer(&mut self, site_name: &str, polymer: PolymerId) {
        self.polymers
            .entry(site_name.to_string())
            .or_default()
            .insert(polymer);
    }

    /// Change the count of `species_name` by `delta`. Any nonzero change
    /// queues the dependent reactions for propensity recomputation.
    pub fn increment(&mut self, species_name: &str, delta: i64) {
        *self.species.entry(species_name.to_string()).or_insert(0) += delta;
        if delta == 0 {
            return;
        }
        if let Some(reactions) = self.dependents.get(species_name) {
            self.pending.extend(reactions.iter().copied());
        }
    }

    pub fn increment_transcript(&mut self, gene: &str, delta: i64) {
        *self.transcripts.entry(gene.to_string()).or_insert(0) += delta;
    }

    pub fn increment_ribo(&mut self, gene: &str, delta: i64) {
        *self.ribosomes.entry(gene.to_string()).or_insert(0) += delta;
    }

    /// Current count of a species (zero if it was never seen).
    pub fn count(&self, species_name: &str) -> i64 {
        self.species.get(species_name).copied().unwrap_or(0)
    }

    pub fn transcripts(&self, gene: &str) -> i64 {
        self.transcripts.get(gene).copied().unwrap_or(0)
    }

    pub fn ribosomes(&self, gene: &str) -> i64 {
        self.ribosomes.get(gene).copied().unwrap_or(0)
    }

    pub fn find_polymers(&self, site_name: &str) -> Vec<PolymerId> {
        self.polymers
            .get(site_name)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain the reactions queued by `increment` since the last call.
    pub fn take_notifications(&mut self) -> Vec<ReactionId> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Every species with its count, in name order.
    pub fn species(&self) -> impl Iterator<Item = (&str, i64)> {
        self.species.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Every gene that has a transcript or ribosome count, in name order.
    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.transcripts
            .keys()
            .chain(self.ribosomes.keys())
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
    }
}
