//! Model description.
//!
//! A [`ModelConfig`] fully describes a simulation: species, reactions,
//! polymerases, the ribosome, genomes and standalone transcripts. It can be
//! deserialized from JSON to reproduce a run, and is validated before any
//! engine object is built.

use crate::errors::ConfigError;
use crate::feature::RNASE;
use crate::species::DEFAULT_CELL_VOLUME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Cell volume in liters, used to convert bimolecular rate constants.
    #[serde(default = "default_cell_volume")]
    pub cell_volume: f64,
    /// Optional RNG seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub reactions: Vec<ReactionConfig>,
    #[serde(default)]
    pub polymerases: Vec<PolymeraseConfig>,
    #[serde(default)]
    pub ribosome: Option<RibosomeConfig>,
    #[serde(default)]
    pub genomes: Vec<GenomeConfig>,
    #[serde(default)]
    pub transcripts: Vec<TranscriptConfig>,
}

fn default_cell_volume() -> f64 {
    DEFAULT_CELL_VOLUME
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cell_volume: DEFAULT_CELL_VOLUME,
            seed: None,
            species: Vec::new(),
            reactions: Vec::new(),
            polymerases: Vec::new(),
            ribosome: None,
            genomes: Vec::new(),
            transcripts: Vec::new(),
        }
    }
}

/// Free species with an initial copy number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub copy_number: i64,
}

/// Elementary reaction with a macroscopic rate constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    pub rate_constant: f64,
    pub reactants: Vec<String>,
    pub products: Vec<String>,
}

/// A pool of identical polymerases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymeraseConfig {
    pub name: String,
    pub footprint: u32,
    /// Positions per second at weight 1.0
    pub speed: f64,
    pub copy_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RibosomeConfig {
    pub footprint: u32,
    pub speed: f64,
    pub copy_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    pub start: u32,
    /// Elements allowed to push the mask back
    #[serde(default)]
    pub interactions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoterConfig {
    pub name: String,
    pub start: u32,
    pub stop: u32,
    /// Polymerase name -> macroscopic binding rate constant
    pub interactions: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminatorConfig {
    pub name: String,
    pub start: u32,
    pub stop: u32,
    /// Polymerase name -> termination efficiency in [0, 1]
    pub efficiency: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneConfig {
    pub name: String,
    pub start: u32,
    pub stop: u32,
    pub rbs_start: u32,
    pub rbs_stop: u32,
    pub rbs_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnaseSiteConfig {
    pub start: u32,
    pub stop: u32,
    pub rate: f64,
}

/// Transcript degradation by RNases entering at the 5' end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationConfig {
    pub rate: f64,
    pub rnase_speed: f64,
    pub rnase_footprint: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub name: String,
    pub length: u32,
    #[serde(default)]
    pub mask: Option<MaskConfig>,
    #[serde(default)]
    pub promoters: Vec<PromoterConfig>,
    #[serde(default)]
    pub terminators: Vec<TerminatorConfig>,
    #[serde(default)]
    pub genes: Vec<GeneConfig>,
    #[serde(default)]
    pub rnase_sites: Vec<RnaseSiteConfig>,
    /// Per-position translation speed weights for spawned transcripts
    #[serde(default)]
    pub transcript_weights: Option<Vec<f64>>,
    #[serde(default)]
    pub degradation: Option<DegradationConfig>,
}

impl GenomeConfig {
    pub fn new(name: impl Into<String>, length: u32) -> Self {
        Self {
            name: name.into(),
            length,
            mask: None,
            promoters: Vec::new(),
            terminators: Vec::new(),
            genes: Vec::new(),
            rnase_sites: Vec::new(),
            transcript_weights: None,
            degradation: None,
        }
    }

    pub fn mask(mut self, start: u32, interactions: &[&str]) -> Self {
        self.mask = Some(MaskConfig {
            start,
            interactions: interactions.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn promoter(
        mut self,
        name: &str,
        start: u32,
        stop: u32,
        interactions: &[(&str, f64)],
    ) -> Self {
        self.promoters.push(PromoterConfig {
            name: name.to_string(),
            start,
            stop,
            interactions: to_map(interactions),
        });
        self
    }

    pub fn terminator(
        mut self,
        name: &str,
        start: u32,
        stop: u32,
        efficiency: &[(&str, f64)],
    ) -> Self {
        self.terminators.push(TerminatorConfig {
            name: name.to_string(),
            start,
            stop,
            efficiency: to_map(efficiency),
        });
        self
    }

    pub fn gene(
        mut self,
        name: &str,
        start: u32,
        stop: u32,
        rbs_start: u32,
        rbs_stop: u32,
        rbs_strength: f64,
    ) -> Self {
        self.genes.push(GeneConfig {
            name: name.to_string(),
            start,
            stop,
            rbs_start,
            rbs_stop,
            rbs_strength,
        });
        self
    }

    pub fn rnase_site(mut self, start: u32, stop: u32, rate: f64) -> Self {
        self.rnase_sites.push(RnaseSiteConfig { start, stop, rate });
        self
    }

    pub fn transcript_weights(mut self, weights: Vec<f64>) -> Self {
        self.transcript_weights = Some(weights);
        self
    }

    pub fn degradation(mut self, rate: f64, rnase_speed: f64, rnase_footprint: u32) -> Self {
        self.degradation = Some(DegradationConfig {
            rate,
            rnase_speed,
            rnase_footprint,
        });
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let context = format!("genome '{}'", self.name);
        if self.length == 0 {
            return Err(invalid(format!("{context} must have a positive length")));
        }
        if let Some(mask) = &self.mask {
            check_span(&context, "mask", mask.start, self.length, self.length)?;
        }
        for p in &self.promoters {
            check_span(&context, &p.name, p.start, p.stop, self.length)?;
            check_rates(&context, &p.name, &p.interactions)?;
        }
        for t in &self.terminators {
            check_span(&context, &t.name, t.start, t.stop, self.length)?;
            for (element, &e) in &t.efficiency {
                if !(0.0..=1.0).contains(&e) {
                    return Err(invalid(format!(
                        "{context}: efficiency of {} for {element} must be in [0, 1], got {e}",
                        t.name
                    )));
                }
            }
        }
        for g in &self.genes {
            validate_gene(&context, g, self.length)?;
        }
        for r in &self.rnase_sites {
            check_span(&context, "rnase site", r.start, r.stop, self.length)?;
            check_rate(&context, "rnase site", r.rate)?;
        }
        if let Some(weights) = &self.transcript_weights {
            check_weights(&context, weights, self.length)?;
        }
        if let Some(d) = &self.degradation {
            check_rate(&context, "degradation", d.rate)?;
            check_mover(&context, RNASE, d.rnase_footprint, d.rnase_speed)?;
        }
        Ok(())
    }
}

/// A transcript that exists from the start, independent of any genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub name: String,
    pub length: u32,
    /// Number of copies to create
    #[serde(default = "default_copy_number")]
    pub copy_number: usize,
    #[serde(default)]
    pub genes: Vec<GeneConfig>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

fn default_copy_number() -> usize {
    1
}

impl ModelConfig {
    /// Parse a model from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every parameter before any engine object is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_volume > 0.0) {
            return Err(invalid(format!(
                "cell volume must be positive, got {}",
                self.cell_volume
            )));
        }
        for s in &self.species {
            if s.copy_number < 0 {
                return Err(invalid(format!("species '{}' has a negative copy number", s.name)));
            }
        }
        for r in &self.reactions {
            check_rate("reaction", "rate constant", r.rate_constant)?;
            if r.reactants.len() > 2 {
                return Err(invalid(format!(
                    "reaction {:?} -> {:?} has more than two reactants",
                    r.reactants, r.products
                )));
            }
        }
        for p in &self.polymerases {
            check_mover("polymerase", &p.name, p.footprint, p.speed)?;
            if p.copy_number < 0 {
                return Err(invalid(format!("polymerase '{}' has a negative copy number", p.name)));
            }
        }
        if let Some(r) = &self.ribosome {
            check_mover("ribosome", "ribosome", r.footprint, r.speed)?;
            if r.copy_number < 0 {
                return Err(invalid("ribosome has a negative copy number".to_string()));
            }
        }
        for g in &self.genomes {
            g.validate()?;
            for p in &g.promoters {
                for element in p.interactions.keys() {
                    if !self.polymerases.iter().any(|pol| &pol.name == element) {
                        return Err(ConfigError::UnknownPolymerase(element.clone()));
                    }
                }
            }
        }
        for t in &self.transcripts {
            let context = format!("transcript '{}'", t.name);
            if t.length == 0 {
                return Err(invalid(format!("{context} must have a positive length")));
            }
            for g in &t.genes {
                validate_gene(&context, g, t.length)?;
            }
            if let Some(weights) = &t.weights {
                check_weights(&context, weights, t.length)?;
            }
        }
        let has_genes = self.genomes.iter().any(|g| !g.genes.is_empty())
            || self.transcripts.iter().any(|t| !t.genes.is_empty());
        if has_genes && self.ribosome.is_none() {
            return Err(invalid("genes are defined but no ribosome is configured".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidParameter(message)
}

fn to_map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

fn check_span(
    context: &str,
    what: &str,
    start: u32,
    stop: u32,
    length: u32,
) -> Result<(), ConfigError> {
    if start == 0 || start > stop || stop > length {
        return Err(invalid(format!(
            "{context}: {what} [{start}, {stop}] must lie within [1, {length}] with start <= stop"
        )));
    }
    Ok(())
}

fn check_rate(context: &str, what: &str, rate: f64) -> Result<(), ConfigError> {
    if !(rate >= 0.0) || !rate.is_finite() {
        return Err(invalid(format!(
            "{context}: {what} must be a finite non-negative rate, got {rate}"
        )));
    }
    Ok(())
}

fn check_rates(
    context: &str,
    what: &str,
    rates: &BTreeMap<String, f64>,
) -> Result<(), ConfigError> {
    rates.values().try_for_each(|&r| check_rate(context, what, r))
}

fn check_mover(context: &str, name: &str, footprint: u32, speed: f64) -> Result<(), ConfigError> {
    if footprint == 0 {
        return Err(invalid(format!("{context} '{name}' must have a positive footprint")));
    }
    if !(speed > 0.0) || !speed.is_finite() {
        return Err(invalid(format!("{context} '{name}' must have a positive speed, got {speed}")));
    }
    Ok(())
}

fn check_weights(context: &str, weights: &[f64], length: u32) -> Result<(), ConfigError> {
    if weights.len() != length as usize {
        return Err(invalid(format!(
            "{context}: weights must have {length} entries, got {}",
            weights.len()
        )));
    }
    if weights.iter().any(|w| !(*w >= 0.0)) {
        return Err(invalid(format!("{context}: weights must be non-negative")));
    }
    Ok(())
}

fn validate_gene(context: &str, gene: &GeneConfig, length: u32) -> Result<(), ConfigError> {
    check_span(context, &gene.name, gene.start, gene.stop, length)?;
    check_span(context, &format!("{}_rbs", gene.name), gene.rbs_start, gene.rbs_stop, length)?;
    if gene.stop < 2 {
        return Err(invalid(format!(
            "{context}: gene '{}' is too short for a stop codon",
            gene.name
        )));
    }
    check_rate(context, "rbs strength", gene.rbs_strength)
}
