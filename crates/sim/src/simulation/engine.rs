//! Simulation engine.
//!
//! The engine runs Gillespie's direct method over three kinds of channels:
//! species reactions, binding reactions (a free mobile element attaching to a
//! named site on any polymer) and polymers (one bound element moving one
//! position). Polymer events are applied to the species counts after every
//! step.

use super::config::{GenomeConfig, ModelConfig, TranscriptConfig};
use crate::base::weighted_index;
use crate::errors::{ConfigError, PolymerError, SimulationError};
use crate::feature::{MobileElement, RIBOSOME, RNASE, RUNOFF_GENE};
use crate::polymer::{
    Context, Degradation, Genome, PolymerEvent, PolymerId, Transcript, TranscriptId,
};
use crate::species::{mesoscopic, ReactionId, SpeciesReaction, SpeciesTracker};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A free mobile element binding a named site on whichever polymer carries
/// one.
#[derive(Debug, Clone, PartialEq)]
pub struct BindReaction {
    rate_constant: f64,
    site: String,
    template: MobileElement,
}

impl BindReaction {
    /// RNases are not pooled, so their rate is used as a first-order
    /// constant; every other element binds with a bimolecular rate.
    pub fn new(
        rate_constant: f64,
        site: impl Into<String>,
        template: MobileElement,
        cell_volume: f64,
    ) -> Self {
        let rate_constant = if template.is_rnase() {
            rate_constant
        } else {
            mesoscopic(rate_constant, cell_volume)
        };
        Self {
            rate_constant,
            site: site.into(),
            template,
        }
    }

    pub fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn template(&self) -> &MobileElement {
        &self.template
    }

    pub fn propensity(&self, tracker: &SpeciesTracker) -> f64 {
        let sites = tracker.count(&self.site) as f64;
        if self.template.is_rnase() {
            self.rate_constant * sites
        } else {
            self.rate_constant * sites * tracker.count(self.template.name()) as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Species(SpeciesReaction),
    Bind(BindReaction),
}

impl Reaction {
    pub fn propensity(&self, tracker: &SpeciesTracker) -> f64 {
        match self {
            Self::Species(r) => r.propensity(tracker),
            Self::Bind(r) => r.propensity(tracker),
        }
    }
}

/// Counts of one species (or gene) at a reporting time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountsRecord {
    pub time: f64,
    pub species: String,
    /// Free copy number (the protein count for genes)
    pub protein: i64,
    /// Transcripts with an exposed ribosome binding site for this gene
    pub transcript: i64,
    /// Ribosomes that initiated translation of this gene
    pub ribosome: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Reaction(usize),
    Genome(usize),
    Transcript(usize),
}

/// Main simulation engine.
#[derive(Debug)]
pub struct Simulation {
    tracker: SpeciesTracker,
    reactions: Vec<Reaction>,
    /// Cached propensity of each reaction
    propensities: Vec<f64>,
    /// (site, element) pairs that already have a binding reaction
    bind_keys: BTreeSet<(String, String)>,
    genomes: Vec<Genome>,
    transcripts: Vec<Transcript>,
    /// Free mobile element templates by name
    polymerases: BTreeMap<String, MobileElement>,
    cell_volume: f64,
    time: f64,
    iterations: u64,
    /// Random number generator (using Xoshiro256++ for better performance)
    rng: Xoshiro256PlusPlus,
}

impl Simulation {
    /// Create an empty simulation.
    pub fn new(seed: Option<u64>, cell_volume: f64) -> Self {
        let rng = if let Some(seed) = seed {
            Xoshiro256PlusPlus::seed_from_u64(seed)
        } else {
            Xoshiro256PlusPlus::from_seed(rand::rng().random())
        };
        Self {
            tracker: SpeciesTracker::new(),
            reactions: Vec::new(),
            propensities: Vec::new(),
            bind_keys: BTreeSet::new(),
            genomes: Vec::new(),
            transcripts: Vec::new(),
            polymerases: BTreeMap::new(),
            cell_volume,
            time: 0.0,
            iterations: 0,
            rng,
        }
    }

    /// Build a simulation from a validated model description.
    pub fn from_config(config: &ModelConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut sim = Self::new(config.seed, config.cell_volume);

        for s in &config.species {
            sim.add_species(&s.name, s.copy_number);
        }
        for p in &config.polymerases {
            sim.add_polymerase(&p.name, p.footprint, p.speed, p.copy_number);
        }
        if let Some(r) = &config.ribosome {
            sim.add_ribosome(r.footprint, r.speed, r.copy_number);
        }
        for r in &config.reactions {
            sim.add_reaction(r.rate_constant, r.reactants.clone(), r.products.clone())?;
        }
        for g in &config.genomes {
            sim.register_genome(build_genome(g)?)?;
        }
        for t in &config.transcripts {
            for _ in 0..t.copy_number {
                sim.register_transcript(build_transcript(t)?)?;
            }
        }
        log::info!(
            "[Model] {} genomes, {} transcripts, {} reactions",
            sim.genomes.len(),
            sim.transcripts.len(),
            sim.reactions.len()
        );
        Ok(sim)
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Self::from_config(&ModelConfig::from_json(json)?)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of reactions fired so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn tracker(&self) -> &SpeciesTracker {
        &self.tracker
    }

    pub fn count(&self, species: &str) -> i64 {
        self.tracker.count(species)
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn add_species(&mut self, name: &str, copy_number: i64) {
        self.tracker.increment(name, copy_number);
    }

    /// Add a pool of free polymerases called `name`.
    pub fn add_polymerase(&mut self, name: &str, footprint: u32, speed: f64, copy_number: i64) {
        self.polymerases
            .insert(name.to_string(), MobileElement::polymerase(name, footprint, speed));
        self.tracker.increment(name, copy_number);
    }

    pub fn add_ribosome(&mut self, footprint: u32, speed: f64, copy_number: i64) {
        self.add_polymerase(RIBOSOME, footprint, speed, copy_number);
    }

    pub fn add_reaction(
        &mut self,
        rate_constant: f64,
        reactants: Vec<String>,
        products: Vec<String>,
    ) -> Result<ReactionId, SimulationError> {
        let reaction = SpeciesReaction::new(rate_constant, reactants, products, self.cell_volume)?;
        let id = ReactionId(self.reactions.len());
        self.tracker.register(id, &reaction);
        self.push_reaction(Reaction::Species(reaction));
        Ok(id)
    }

    fn push_reaction(&mut self, reaction: Reaction) {
        self.propensities.push(reaction.propensity(&self.tracker));
        self.reactions.push(reaction);
    }

    fn add_bind_reaction(&mut self, site: &str, template: MobileElement, rate_constant: f64) {
        if !self
            .bind_keys
            .insert((site.to_string(), template.name().to_string()))
        {
            return;
        }
        let id = ReactionId(self.reactions.len());
        self.tracker.add_reaction(site, id);
        if !template.is_rnase() {
            self.tracker.add_reaction(template.name(), id);
        }
        log::debug!("[Model] binding reaction {} + {site}", template.name());
        let reaction = BindReaction::new(rate_constant, site, template, self.cell_volume);
        self.push_reaction(Reaction::Bind(reaction));
    }

    /// One binding reaction per (site, element) pair.
    fn register_bindings(
        &mut self,
        bindings: &BTreeMap<String, BTreeMap<String, f64>>,
        degradation: Option<Degradation>,
    ) -> Result<(), SimulationError> {
        for (site, rates) in bindings {
            for (element, &rate) in rates {
                let template = if element == RNASE {
                    let d = degradation.ok_or_else(|| {
                        ConfigError::InvalidParameter(format!(
                            "RNase site {site} needs degradation settings"
                        ))
                    })?;
                    MobileElement::rnase(d.rnase_footprint, d.rnase_speed)
                } else {
                    self.polymerases
                        .get(element)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownPolymerase(element.clone()))?
                };
                self.add_bind_reaction(site, template, rate);
            }
        }
        Ok(())
    }

    /// Initialize `genome` and create the binding reactions of its
    /// promoters and of the transcripts it will produce.
    pub fn register_genome(&mut self, mut genome: Genome) -> Result<(), SimulationError> {
        genome.set_index(self.genomes.len());
        genome.initialize(&mut self.tracker)?;
        let bindings = genome.bindings().clone();
        let degradation = genome.degradation();
        self.genomes.push(genome);
        self.register_bindings(&bindings, degradation)
    }

    /// Add a standalone transcript.
    pub fn register_transcript(
        &mut self,
        mut transcript: Transcript,
    ) -> Result<TranscriptId, SimulationError> {
        let id = TranscriptId(self.transcripts.len());
        transcript.set_index(id);
        transcript.initialize(&mut self.tracker)?;
        let bindings: BTreeMap<String, BTreeMap<String, f64>> = transcript
            .polymer()
            .binding_sites()
            .iter()
            .map(|site| {
                let rates = site
                    .interactions()
                    .iter()
                    .map(|(k, &v)| (k.clone(), v))
                    .collect();
                (site.name().to_string(), rates)
            })
            .collect();
        self.transcripts.push(transcript);
        self.register_bindings(&bindings, None)?;
        Ok(id)
    }

    fn refresh_propensities(&mut self) {
        for id in self.tracker.take_notifications() {
            if let Some(reaction) = self.reactions.get(id.0) {
                self.propensities[id.0] = reaction.propensity(&self.tracker);
            }
        }
    }

    fn total_propensity(&self) -> f64 {
        let reactions: f64 = self.propensities.iter().sum();
        let genomes: f64 = self.genomes.iter().map(|g| g.polymer().prop_sum()).sum();
        let transcripts: f64 = self.transcripts.iter().map(|t| t.polymer().prop_sum()).sum();
        reactions + genomes + transcripts
    }

    fn draw_wait(&mut self, total: f64) -> Result<f64, SimulationError> {
        let exp = Exp::new(total).map_err(|_| SimulationError::Exhausted(self.time))?;
        Ok(exp.sample(&mut self.rng))
    }

    fn select(&self, mut target: f64) -> Option<Channel> {
        let reactions = self
            .propensities
            .iter()
            .enumerate()
            .map(|(i, &p)| (Channel::Reaction(i), p));
        let genomes = self
            .genomes
            .iter()
            .enumerate()
            .map(|(i, g)| (Channel::Genome(i), g.polymer().prop_sum()));
        let transcripts = self
            .transcripts
            .iter()
            .enumerate()
            .map(|(i, t)| (Channel::Transcript(i), t.polymer().prop_sum()));

        let mut last = None;
        for (channel, p) in reactions.chain(genomes).chain(transcripts) {
            if p <= 0.0 {
                continue;
            }
            if target < p {
                return Some(channel);
            }
            target -= p;
            last = Some(channel);
        }
        // Floating point slack: fall back to the last live channel.
        last
    }

    /// Fire one reaction and return the new simulation time.
    ///
    /// # Errors
    /// Returns [`SimulationError::Exhausted`] when nothing can happen anymore.
    pub fn step(&mut self) -> Result<f64, SimulationError> {
        self.refresh_propensities();
        let total = self.total_propensity();
        if total <= 0.0 {
            return Err(SimulationError::Exhausted(self.time));
        }
        self.time += self.draw_wait(total)?;
        self.fire(total)?;
        Ok(self.time)
    }

    /// Run until `time_limit`, recording counts every `time_step` starting at
    /// the current time.
    pub fn run(
        &mut self,
        time_limit: f64,
        time_step: f64,
    ) -> Result<Vec<CountsRecord>, SimulationError> {
        if time_step.is_nan() || time_step <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "time step must be positive, got {time_step}"
            ))
            .into());
        }
        let start = self.time;
        let mut reports = 0u64;
        let mut records = Vec::new();

        loop {
            self.refresh_propensities();
            let total = self.total_propensity();
            let next_time = if total > 0.0 {
                self.time + self.draw_wait(total)?
            } else {
                f64::INFINITY
            };

            loop {
                let report_time = start + reports as f64 * time_step;
                if report_time > time_limit || report_time >= next_time {
                    break;
                }
                records.extend(self.snapshot(report_time));
                log::info!(
                    "[Run] t = {report_time:.3}, {} transcripts, {} reactions fired",
                    self.transcripts.len(),
                    self.iterations
                );
                reports += 1;
            }

            if next_time > time_limit {
                self.time = time_limit;
                break;
            }
            self.time = next_time;
            self.fire(total)?;
        }
        Ok(records)
    }

    /// Counts of every public species and gene at `time`.
    pub fn snapshot(&self, time: f64) -> Vec<CountsRecord> {
        let names: BTreeSet<&str> = self
            .tracker
            .species()
            .map(|(name, _)| name)
            .chain(self.tracker.genes())
            .filter(|name| !name.starts_with("__"))
            .collect();
        names
            .into_iter()
            .map(|name| CountsRecord {
                time,
                species: name.to_string(),
                protein: self.tracker.count(name),
                transcript: self.tracker.transcripts(name),
                ribosome: self.tracker.ribosomes(name),
            })
            .collect()
    }

    fn fire(&mut self, total: f64) -> Result<(), SimulationError> {
        let target = self.rng.random::<f64>() * total;
        let Some(channel) = self.select(target) else {
            return Err(SimulationError::Exhausted(self.time));
        };
        self.iterations += 1;

        let mut events = Vec::new();
        match channel {
            Channel::Reaction(i) => match &self.reactions[i] {
                Reaction::Species(r) => r.execute(&mut self.tracker),
                Reaction::Bind(r) => {
                    let site = r.site().to_string();
                    let template = r.template().clone();
                    self.fire_bind(&site, template, &mut events)?;
                }
            },
            Channel::Genome(i) => {
                let mut ctx = Context::new(&mut self.tracker, &mut self.rng, &mut events);
                self.genomes[i].execute(&mut ctx, &mut self.transcripts)?;
            }
            Channel::Transcript(i) => {
                let mut ctx = Context::new(&mut self.tracker, &mut self.rng, &mut events);
                self.transcripts[i].execute(&mut ctx)?;
            }
        }
        self.apply_events(events);
        Ok(())
    }

    fn uncovered(&self, polymer: PolymerId, site: &str) -> i64 {
        match polymer {
            PolymerId::Genome(i) => self.genomes.get(i).map(|g| g.polymer().uncovered(site)),
            PolymerId::Transcript(i) => {
                self.transcripts.get(i).map(|t| t.polymer().uncovered(site))
            }
        }
        .unwrap_or(0)
    }

    /// Bind a fresh copy of `template` to a polymer chosen in proportion to
    /// its number of free `site`s.
    fn fire_bind(
        &mut self,
        site: &str,
        template: MobileElement,
        events: &mut Vec<PolymerEvent>,
    ) -> Result<(), SimulationError> {
        let candidates = self.tracker.find_polymers(site);
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&p| self.uncovered(p, site).max(0) as f64)
            .collect();
        let Some(k) = weighted_index(&weights, &mut self.rng) else {
            return Err(PolymerError::NoFreeSite {
                polymer: "any polymer".to_string(),
                element: template.name().to_string(),
                site: site.to_string(),
            }
            .into());
        };

        let name = template.name().to_string();
        let pooled = !template.is_rnase();
        let mut ctx = Context::new(&mut self.tracker, &mut self.rng, events);
        let bound = match candidates[k] {
            PolymerId::Genome(i) => {
                let len = self.genomes.len();
                let genome = self.genomes.get_mut(i).ok_or(PolymerError::IndexOutOfRange {
                    polymer: "genomes".to_string(),
                    index: i,
                    len,
                })?;
                genome
                    .bind(template, site, &mut ctx, &mut self.transcripts)
                    .map(|_| ())
            }
            PolymerId::Transcript(i) => {
                let transcript = self.transcripts.get_mut(i).ok_or_else(|| {
                    PolymerError::UnknownTranscript {
                        polymer: site.to_string(),
                        transcript: i,
                    }
                })?;
                transcript.bind(template, site, &mut ctx)
            }
        };
        match bound {
            Ok(()) => {}
            // The collision is lost; the element stays free.
            Err(PolymerError::SiteBlocked { polymer, .. }) => {
                log::trace!("[Bind] {name} blocked at {site} on {polymer}");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        if pooled {
            self.tracker.increment(&name, -1);
        }
        Ok(())
    }

    fn apply_events(&mut self, events: Vec<PolymerEvent>) {
        for event in events {
            match event {
                PolymerEvent::Termination { element, gene, .. } => {
                    if element != RNASE {
                        self.tracker.increment(&element, 1);
                    }
                    if gene != RUNOFF_GENE && !gene.is_empty() {
                        self.tracker.increment(&gene, 1);
                    }
                }
                PolymerEvent::TranscriptCreated { parent, transcript } => {
                    log::trace!("[Transcript] {parent} -> transcript[{}]", transcript.0);
                }
            }
        }
    }
}

fn build_genome(config: &GenomeConfig) -> Result<Genome, PolymerError> {
    let mut genome = Genome::new(&config.name, config.length);
    if let Some(d) = &config.degradation {
        genome = genome.with_degradation(d.rate, d.rnase_speed, d.rnase_footprint);
    }
    if let Some(mask) = &config.mask {
        genome.add_mask(mask.start, mask.interactions.iter().cloned());
    }
    for p in &config.promoters {
        genome.add_promoter(&p.name, p.start, p.stop, p.interactions.clone());
    }
    for t in &config.terminators {
        genome.add_terminator(&t.name, t.start, t.stop, t.efficiency.clone());
    }
    for g in &config.genes {
        genome.add_gene(&g.name, g.start, g.stop, g.rbs_start, g.rbs_stop, g.rbs_strength);
    }
    for r in &config.rnase_sites {
        genome.add_rnase_site(r.start, r.stop, r.rate);
    }
    if let Some(weights) = &config.transcript_weights {
        genome.add_weights(weights.clone())?;
    }
    Ok(genome)
}

fn build_transcript(config: &TranscriptConfig) -> Result<Transcript, PolymerError> {
    let mut transcript = Transcript::new(&config.name, config.length);
    for g in &config.genes {
        transcript.add_gene(&g.name, g.start, g.stop, g.rbs_start, g.rbs_stop, g.rbs_strength);
    }
    if let Some(weights) = &config.weights {
        transcript.add_weights(weights.clone())?;
    }
    Ok(transcript)
}
