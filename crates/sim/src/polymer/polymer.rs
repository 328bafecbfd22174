use super::{
    Context, MobileElementManager, MoveOutcome, PolymerEvent, PolymerId, Step, TranscriptId,
};
use crate::base::{weighted_index, Interval, IntervalTree};
use crate::errors::PolymerError;
use crate::feature::{BindingSite, MobileElement, ReleaseSite, SiteRole, RUNOFF_GENE};
use crate::species::SpeciesTracker;
use rand::Rng;
use std::collections::BTreeMap;

/// A linear polymer (genome or transcript) over the inclusive range
/// `[start, stop]`.
///
/// Fixed features are added while the polymer is configured and indexed
/// once by [`Polymer::initialize`]. After that, mobile elements bind with
/// [`Polymer::bind`] and move one position per [`Polymer::execute`].
///
/// Coverage rules, for an element moving from `[old_start, old_stop]` to
/// `[new_start, new_stop]`:
/// - a site becomes covered when the leading edge reaches its start;
/// - a site becomes uncovered when the trailing edge moves past its stop;
/// - two elements, or an element and the mask, may share a single position,
///   which counts as a collision but not as an error.
#[derive(Debug, Clone)]
pub struct Polymer {
    id: PolymerId,
    name: String,
    start: u32,
    stop: u32,
    mask: MobileElement,
    elements: MobileElementManager,
    binding_sites: Vec<BindingSite>,
    release_sites: Vec<ReleaseSite>,
    binding_index: IntervalTree<usize>,
    release_index: IntervalTree<usize>,
    /// Site name -> number of uncovered sites with that name on this polymer.
    uncovered: BTreeMap<String, i64>,
}

impl Polymer {
    /// An empty polymer with uniform weights and no mask.
    pub fn new(id: PolymerId, name: impl Into<String>, start: u32, stop: u32) -> Self {
        let weights = vec![1.0; (stop + 1).saturating_sub(start) as usize];
        Self::with_weights(id, name, start, stop, weights)
    }

    pub(crate) fn with_weights(
        id: PolymerId,
        name: impl Into<String>,
        start: u32,
        stop: u32,
        weights: Vec<f64>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            elements: MobileElementManager::new(name.clone(), weights),
            name,
            start,
            stop,
            mask: MobileElement::mask(stop + 1, stop, std::iter::empty::<String>()),
            binding_sites: Vec::new(),
            release_sites: Vec::new(),
            binding_index: IntervalTree::default(),
            release_index: IntervalTree::default(),
            uncovered: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PolymerId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: PolymerId) {
        self.id = id;
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

    pub fn mask(&self) -> &MobileElement {
        &self.mask
    }

    pub fn set_mask(&mut self, mask: MobileElement) {
        self.mask = mask;
    }

    pub fn elements(&self) -> &MobileElementManager {
        &self.elements
    }

    pub fn binding_sites(&self) -> &[BindingSite] {
        &self.binding_sites
    }

    pub fn release_sites(&self) -> &[ReleaseSite] {
        &self.release_sites
    }

    /// Number of uncovered binding sites called `name`.
    pub fn uncovered(&self, name: &str) -> i64 {
        self.uncovered.get(name).copied().unwrap_or(0)
    }

    /// Aggregate movement propensity of all bound elements.
    pub fn prop_sum(&self) -> f64 {
        self.elements.prop_sum()
    }

    pub fn add_binding_site(&mut self, site: BindingSite) {
        self.binding_sites.push(site);
    }

    pub fn add_release_site(&mut self, site: ReleaseSite) {
        self.release_sites.push(site);
    }

    /// Replace the per-position speed weights. Leaves the current profile
    /// untouched if `weights` does not have one entry per position.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<(), PolymerError> {
        let expected = (self.stop + 1).saturating_sub(self.start) as usize;
        if weights.len() != expected {
            return Err(PolymerError::WeightLength {
                polymer: self.name.clone(),
                expected,
                actual: weights.len(),
            });
        }
        self.elements.set_weights(weights)
    }

    /// Index the fixed features, apply the initial mask and publish the
    /// exposed sites to the tracker.
    pub fn initialize(&mut self, tracker: &mut SpeciesTracker) -> Result<(), PolymerError> {
        self.binding_index = self
            .binding_sites
            .iter()
            .enumerate()
            .map(|(i, site)| Interval::new(site.start(), site.stop(), i))
            .collect();
        self.release_index = self
            .release_sites
            .iter()
            .enumerate()
            .map(|(i, site)| Interval::new(site.start(), site.stop(), i))
            .collect();

        for site in &self.binding_sites {
            tracker.add_polymer(site.name(), self.id);
        }

        if !self.mask.is_empty() {
            let (start, stop) = (self.mask.start(), self.mask.stop());
            for i in indices(self.binding_index.find_overlapping(start, stop)) {
                let site = &mut self.binding_sites[i];
                site.cover();
                site.reset_state();
            }
            for i in indices(self.release_index.find_overlapping(start, stop)) {
                let site = &mut self.release_sites[i];
                site.cover();
                site.reset_state();
            }
        }

        if self.mask.start() > self.start {
            let exposed = indices(
                self.binding_index
                    .find_contained(self.start, self.mask.start() - 1),
            );
            for i in exposed {
                self.binding_sites[i].uncover();
                self.binding_sites[i].reset_state();
                self.expose(i, tracker);
            }
        }
        log::debug!(
            "[Init] {} ({}) [{}, {}], mask at {}",
            self.name,
            self.id,
            self.start,
            self.stop,
            self.mask.start()
        );
        Ok(())
    }

    /// Pick a free, unmasked binding site called `site_name` for `element`.
    fn find_binding_site<R: Rng + ?Sized>(
        &self,
        element: &MobileElement,
        site_name: &str,
        rng: &mut R,
    ) -> Result<usize, PolymerError> {
        let candidates: Vec<usize> = self
            .binding_index
            .find_overlapping(self.start, self.mask.start())
            .into_iter()
            .map(|interval| interval.value)
            .filter(|&i| {
                let site = &self.binding_sites[i];
                site.name() == site_name && !site.is_covered()
            })
            .collect();
        if candidates.is_empty() {
            return Err(PolymerError::NoFreeSite {
                polymer: self.name.clone(),
                element: element.name().to_string(),
                site: site_name.to_string(),
            });
        }
        // A footprint longer than its site may reach a downstream element.
        let footprint = element.footprint().max(1);
        let candidates: Vec<usize> = candidates
            .into_iter()
            .filter(|&i| {
                let start = self.binding_sites[i].start();
                let stop = start + footprint - 1;
                !self
                    .elements
                    .iter()
                    .any(|b| b.element.start() <= stop && b.element.stop() >= start)
            })
            .collect();
        if candidates.is_empty() {
            return Err(PolymerError::SiteBlocked {
                polymer: self.name.clone(),
                element: element.name().to_string(),
                site: site_name.to_string(),
            });
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|&i| self.binding_sites[i].interaction(element.name()).unwrap_or(0.0))
            .collect();
        let chosen = candidates[weighted_index(&weights, rng).unwrap_or(0)];
        if !self.binding_sites[chosen].check_interaction(element.name()) {
            return Err(PolymerError::NoInteraction {
                element: element.name().to_string(),
                site: site_name.to_string(),
            });
        }
        Ok(chosen)
    }

    /// Position `element` on a free site called `site_name` and cover that
    /// site. The element is not inserted yet.
    pub(crate) fn place<R: Rng + ?Sized>(
        &mut self,
        element: &mut MobileElement,
        site_name: &str,
        ctx: &mut Context<'_, R>,
    ) -> Result<(), PolymerError> {
        let i = self.find_binding_site(element, site_name, ctx.rng)?;
        element.place_at(self.binding_sites[i].start());
        if element.stop() >= self.mask.start() {
            return Err(PolymerError::MaskOverlapOnBind {
                polymer: self.name.clone(),
                element: element.name().to_string(),
                site: site_name.to_string(),
            });
        }

        let site = &mut self.binding_sites[i];
        site.cover();
        site.reset_state();
        let is_rbs = site.role() == SiteRole::Rbs;
        let gene = site.gene().to_string();
        self.log_cover(site_name, ctx.tracker)?;
        if is_rbs {
            ctx.tracker.increment_ribo(&gene, 1);
        }
        self.cover_footprint(i, element, ctx.tracker)?;
        log::debug!(
            "[Bind] {} bound {} on {} at [{}, {}]",
            element.name(),
            site_name,
            self.name,
            element.start(),
            element.stop()
        );
        Ok(())
    }

    /// Cover every other site reaching under a freshly placed element. The
    /// trailing edge releases them like any site it moves past.
    fn cover_footprint(
        &mut self,
        bound_site: usize,
        element: &MobileElement,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        let (start, stop) = (element.start(), element.stop());
        for i in indices(self.binding_index.find_overlapping(start, stop)) {
            if i != bound_site {
                self.cover_binding_site(i, element.is_rnase(), tracker)?;
            }
        }
        for i in indices(self.release_index.find_overlapping(start, stop)) {
            let site = &mut self.release_sites[i];
            site.cover();
            site.reset_state();
        }
        Ok(())
    }

    pub(crate) fn attach(
        &mut self,
        element: MobileElement,
        attached: Option<TranscriptId>,
    ) -> Result<usize, PolymerError> {
        self.elements.insert(element, attached)
    }

    /// Bind `element` to a free site called `site_name`.
    pub fn bind<R: Rng + ?Sized>(
        &mut self,
        mut element: MobileElement,
        site_name: &str,
        ctx: &mut Context<'_, R>,
    ) -> Result<(), PolymerError> {
        self.place(&mut element, site_name, ctx)?;
        self.attach(element, None)?;
        Ok(())
    }

    /// Move one bound element, chosen by propensity, by one step.
    pub fn execute<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, R>,
    ) -> Result<Step, PolymerError> {
        if self.elements.prop_sum() <= 0.0 {
            return Err(PolymerError::ZeroPropensity {
                polymer: self.name.clone(),
            });
        }
        let index = self.elements.choose(ctx.rng)?;
        self.move_element(index, ctx)
    }

    /// Move the element at `index` by one step and resolve collisions,
    /// termination and coverage changes.
    pub fn move_element<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        ctx: &mut Context<'_, R>,
    ) -> Result<Step, PolymerError> {
        let (old_start, old_stop) = {
            let element = self.elements.get_mut(index)?;
            let span = (element.start(), element.stop());
            element.advance();
            span
        };

        if self.check_element_collision(index)? {
            self.elements.get_mut(index)?.move_back();
            return Ok(Step::blocked());
        }

        if self.check_mask_collision(index)? {
            let authorized = self
                .mask
                .check_interaction(self.elements.get(index)?.element.name());
            if !authorized {
                self.elements.get_mut(index)?.move_back();
                return Ok(Step::blocked());
            }
            self.shift_mask(ctx.tracker)?;
        }

        if let Some(step) = self.check_termination(index, old_start, old_stop, ctx)? {
            return Ok(step);
        }

        let bound = self.elements.get(index)?;
        let (new_start, new_stop) = (bound.element.start(), bound.element.stop());
        let degrading = bound.element.is_rnase();
        let attached = bound.attached;

        self.check_behind(old_start, new_start, ctx.tracker)?;
        self.check_ahead(old_stop, new_stop, degrading, ctx.tracker)?;
        self.elements.update_propensity(index)?;

        Ok(Step {
            outcome: MoveOutcome::Moved,
            shift_child: attached.map(|transcript| (transcript, 1)),
        })
    }

    /// Recede the mask by one position, exposing whatever it uncovers.
    pub fn shift_mask(&mut self, tracker: &mut SpeciesTracker) -> Result<(), PolymerError> {
        if self.mask.is_empty() {
            return Ok(());
        }
        let old_start = self.mask.start();
        self.mask.advance();
        log::trace!("[Mask] {} mask now starts at {}", self.name, self.mask.start());
        self.check_behind(old_start, self.mask.start(), tracker)
    }

    pub fn shift_mask_by(
        &mut self,
        n: u32,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        for _ in 0..n {
            self.shift_mask(tracker)?;
        }
        Ok(())
    }

    /// Does the element at `index` collide with the next element downstream?
    fn check_element_collision(&self, index: usize) -> Result<bool, PolymerError> {
        if !self.elements.valid_index(index + 1) {
            return Ok(false);
        }
        let this = &self.elements.get(index)?.element;
        let next = &self.elements.get(index + 1)?.element;
        if this.stop() >= next.start() && next.stop() >= this.start() {
            if this.stop() > next.start() {
                return Err(PolymerError::ElementOverlap {
                    polymer: self.name.clone(),
                    element: this.name().to_string(),
                    start: this.start(),
                    stop: this.stop(),
                    other: next.name().to_string(),
                    other_start: next.start(),
                    other_stop: next.stop(),
                });
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Does the element at `index` touch the mask?
    fn check_mask_collision(&self, index: usize) -> Result<bool, PolymerError> {
        let element = &self.elements.get(index)?.element;
        if self.mask.start() <= self.stop && element.stop() >= self.mask.start() {
            if element.stop() > self.mask.start() {
                return Err(PolymerError::MaskOverlap {
                    polymer: self.name.clone(),
                    element: element.name().to_string(),
                });
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Remove the element at `index` if it ran off the polymer or stopped at
    /// a release site.
    fn check_termination<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        old_start: u32,
        old_stop: u32,
        ctx: &mut Context<'_, R>,
    ) -> Result<Option<Step>, PolymerError> {
        let bound = self.elements.get(index)?;
        let name = bound.element.name().to_string();
        let (start, stop) = (bound.element.start(), bound.element.stop());
        let reading_frame = bound.element.reading_frame();
        let degrading = bound.element.is_rnase();
        let attached = self.elements.attached(index)?;

        if stop >= self.stop {
            self.elements.delete(index)?;
            if degrading {
                log::debug!("[Degrade] {} fully degraded", self.name);
                return Ok(Some(Step {
                    outcome: MoveOutcome::Terminated,
                    shift_child: None,
                }));
            }
            self.release_covered(old_start, old_stop, ctx.tracker)?;
            ctx.events.push(PolymerEvent::Termination {
                polymer: self.id,
                element: name.clone(),
                gene: RUNOFF_GENE.to_string(),
            });
            log::debug!("[Terminate] {name} ran off {} at {stop}", self.name);
            // The child mask still sits at the previous stop.
            let remaining = self.stop.saturating_sub(old_stop) + 1;
            return Ok(Some(Step {
                outcome: MoveOutcome::Terminated,
                shift_child: attached.map(|transcript| (transcript, remaining)),
            }));
        }

        for i in indices(self.release_index.find_overlapping(start, stop)) {
            let site = &self.release_sites[i];
            if site.readthrough() || !site.check_interaction(&name, reading_frame) {
                continue;
            }
            if ctx.rng.random::<f64>() < site.efficiency(&name) {
                let gene = site.gene().to_string();
                let remaining = site.stop().saturating_sub(stop) + 1;
                self.elements.delete(index)?;
                self.release_covered(old_start, old_stop, ctx.tracker)?;
                log::debug!(
                    "[Terminate] {name} released at {} [{}, {}] on {}",
                    site_label(&self.release_sites[i]),
                    self.release_sites[i].start(),
                    self.release_sites[i].stop(),
                    self.name
                );
                ctx.events.push(PolymerEvent::Termination {
                    polymer: self.id,
                    element: name,
                    gene,
                });
                return Ok(Some(Step {
                    outcome: MoveOutcome::Terminated,
                    shift_child: attached.map(|transcript| (transcript, remaining)),
                }));
            }
            self.release_sites[i].set_readthrough(true);
        }
        Ok(None)
    }

    /// Uncover every site held by an element that occupied
    /// `[start, stop]` and has just left the polymer.
    fn release_covered(
        &mut self,
        start: u32,
        stop: u32,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        for i in indices(self.binding_index.find_overlapping(start, stop)) {
            self.binding_sites[i].uncover();
            if self.binding_sites[i].was_uncovered() {
                let name = self.binding_sites[i].name().to_string();
                self.log_uncover(&name, tracker);
            }
            self.binding_sites[i].reset_state();
        }
        for i in indices(self.release_index.find_overlapping(start, stop)) {
            let site = &mut self.release_sites[i];
            site.uncover();
            if site.was_uncovered() {
                site.set_readthrough(false);
            }
            site.reset_state();
        }
        Ok(())
    }

    /// Uncover sites whose stop the trailing edge moved past while going
    /// from `old_start` to `new_start`.
    fn check_behind(
        &mut self,
        old_start: u32,
        new_start: u32,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        for i in indices(self.binding_index.find_overlapping(old_start, new_start + 1)) {
            if self.binding_sites[i].stop() >= new_start {
                continue;
            }
            self.binding_sites[i].uncover();
            if self.binding_sites[i].was_uncovered() {
                self.expose(i, tracker);
            }
            self.binding_sites[i].reset_state();
        }
        for i in indices(self.release_index.find_overlapping(old_start, new_start + 1)) {
            let site = &mut self.release_sites[i];
            if site.stop() >= new_start {
                continue;
            }
            site.uncover();
            if site.was_uncovered() {
                site.set_readthrough(false);
            }
            site.reset_state();
        }
        Ok(())
    }

    /// Cover sites whose start the leading edge reached while going from
    /// `old_stop` to `new_stop`.
    fn check_ahead(
        &mut self,
        old_stop: u32,
        new_stop: u32,
        degrading: bool,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        for i in indices(self.binding_index.find_overlapping(old_stop + 1, new_stop)) {
            if self.binding_sites[i].start() <= old_stop {
                continue;
            }
            self.cover_binding_site(i, degrading, tracker)?;
        }
        for i in indices(self.release_index.find_overlapping(old_stop + 1, new_stop)) {
            let site = &mut self.release_sites[i];
            if site.start() <= old_stop {
                continue;
            }
            site.cover();
            site.reset_state();
        }
        Ok(())
    }

    /// An RNase covering a ribosome binding site takes its transcript out of
    /// the per-gene count.
    fn cover_binding_site(
        &mut self,
        i: usize,
        degrading: bool,
        tracker: &mut SpeciesTracker,
    ) -> Result<(), PolymerError> {
        let site = &mut self.binding_sites[i];
        site.cover();
        if degrading && site.role() == SiteRole::Rbs && site.first_exposure() {
            // Counted out once. RNases never uncover what they degrade.
            site.set_first_exposure(false);
            tracker.increment_transcript(site.gene(), -1);
        }
        if site.was_covered() {
            let name = site.name().to_string();
            self.log_cover(&name, tracker)?;
        }
        self.binding_sites[i].reset_state();
        Ok(())
    }

    /// Log a newly uncovered binding site, counting the transcript the first
    /// time one of its ribosome binding sites becomes accessible.
    fn expose(&mut self, i: usize, tracker: &mut SpeciesTracker) {
        let name = self.binding_sites[i].name().to_string();
        self.log_uncover(&name, tracker);
        let site = &mut self.binding_sites[i];
        if site.role() == SiteRole::Rbs && !site.first_exposure() {
            tracker.increment_transcript(site.gene(), 1);
            site.set_first_exposure(true);
        }
    }

    fn log_uncover(&mut self, name: &str, tracker: &mut SpeciesTracker) {
        *self.uncovered.entry(name.to_string()).or_insert(0) += 1;
        tracker.increment(name, 1);
        log::trace!("[Cover] {name} uncovered on {}", self.name);
    }

    fn log_cover(&mut self, name: &str, tracker: &mut SpeciesTracker) -> Result<(), PolymerError> {
        match self.uncovered.get_mut(name) {
            None => {
                self.uncovered.insert(name.to_string(), 0);
            }
            Some(count) if *count > 0 => {
                *count -= 1;
                tracker.increment(name, -1);
            }
            Some(_) => {
                return Err(PolymerError::NegativeUncovered {
                    polymer: self.name.clone(),
                    species: name.to_string(),
                });
            }
        }
        log::trace!("[Cover] {name} covered on {}", self.name);
        Ok(())
    }
}

fn indices(hits: Vec<&Interval<usize>>) -> Vec<usize> {
    hits.into_iter().map(|interval| interval.value).collect()
}

fn site_label(site: &ReleaseSite) -> &str {
    if site.gene().is_empty() {
        site.name()
    } else {
        site.gene()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::RIBOSOME;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::collections::HashMap;

    fn rates(name: &str, rate: f64) -> HashMap<String, f64> {
        HashMap::from([(name.to_string(), rate)])
    }

    fn phage(tracker: &mut SpeciesTracker) -> Polymer {
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1e7)));
        polymer.add_release_site(ReleaseSite::new("t1", 90, 91, rates("rnapol", 1.0)));
        polymer.initialize(tracker).unwrap();
        polymer
    }

    struct Harness {
        tracker: SpeciesTracker,
        rng: Xoshiro256PlusPlus,
        events: Vec<PolymerEvent>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tracker: SpeciesTracker::new(),
                rng: Xoshiro256PlusPlus::seed_from_u64(7),
                events: Vec::new(),
            }
        }

        fn ctx(&mut self) -> Context<'_, Xoshiro256PlusPlus> {
            Context::new(&mut self.tracker, &mut self.rng, &mut self.events)
        }
    }

    #[test]
    fn test_initialize_exposes_unmasked_sites() {
        let mut h = Harness::new();
        let polymer = phage(&mut h.tracker);
        assert_eq!(polymer.uncovered("p1"), 1);
        assert_eq!(h.tracker.count("p1"), 1);
        assert_eq!(h.tracker.find_polymers("p1"), vec![PolymerId::Genome(0)]);
    }

    #[test]
    fn test_initialize_respects_mask() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 100);
        polymer.add_binding_site(BindingSite::rbs("gene1", 15, 19, 1e7));
        polymer.add_binding_site(BindingSite::rbs("gene2", 50, 54, 1e7));
        polymer.set_mask(MobileElement::mask(50, 100, [RIBOSOME]));
        polymer.initialize(&mut h.tracker).unwrap();

        assert_eq!(h.tracker.count("gene1_rbs"), 1);
        assert_eq!(h.tracker.count("gene2_rbs"), 0);
        assert_eq!(h.tracker.transcripts("gene1"), 1);
        assert!(polymer.binding_sites()[1].is_covered());

        polymer.shift_mask_by(5, &mut h.tracker).unwrap();
        assert_eq!(h.tracker.count("gene2_rbs"), 1);
        assert_eq!(h.tracker.transcripts("gene2"), 1);
        assert!(!polymer.binding_sites()[1].is_covered());
    }

    #[test]
    fn test_bind_covers_site() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        let pol = MobileElement::polymerase("rnapol", 10, 1.0);
        polymer.bind(pol, "p1", &mut h.ctx()).unwrap();

        assert_eq!(polymer.elements().len(), 1);
        let bound = &polymer.elements().get(0).unwrap().element;
        assert_eq!((bound.start(), bound.stop()), (1, 10));
        assert!(polymer.binding_sites()[0].is_covered());
        assert_eq!(h.tracker.count("p1"), 0);
        assert_eq!(polymer.prop_sum(), 1.0);
    }

    #[test]
    fn test_bind_errors() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        let err = polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p2", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoFreeSite { .. }));

        let err = polymer
            .bind(MobileElement::polymerase("ecolipol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoInteraction { .. }));

        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();
        let err = polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoFreeSite { .. }));
    }

    #[test]
    fn test_bind_into_mask_fails() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1e7)));
        polymer.set_mask(MobileElement::mask(11, 100, ["rnapol"]));
        polymer.initialize(&mut h.tracker).unwrap();

        let err = polymer
            .bind(MobileElement::polymerase("rnapol", 12, 1.0), "p1", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::MaskOverlapOnBind { .. }));
    }

    #[test]
    fn test_execute_without_elements() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        let err = polymer.execute(&mut h.ctx()).unwrap_err();
        assert!(matches!(err, PolymerError::ZeroPropensity { .. }));
    }

    #[test]
    fn test_trailing_edge_uncovers_promoter() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();
        for _ in 0..9 {
            assert_eq!(polymer.execute(&mut h.ctx()).unwrap().outcome, MoveOutcome::Moved);
            assert_eq!(h.tracker.count("p1"), 0);
        }
        polymer.execute(&mut h.ctx()).unwrap();
        let bound = &polymer.elements().get(0).unwrap().element;
        assert_eq!(bound.start(), 11);
        assert_eq!(h.tracker.count("p1"), 1);
        assert!(!polymer.binding_sites()[0].is_covered());
    }

    #[test]
    fn test_collision_blocks_follower() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1.0)));
        polymer.add_binding_site(BindingSite::promoter("p2", 11, 20, rates("rnapol", 1.0)));
        polymer.initialize(&mut h.tracker).unwrap();
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p2", &mut h.ctx())
            .unwrap();

        // [1, 10] -> [2, 11] touches [11, 20] by exactly one position.
        let step = polymer.move_element(0, &mut h.ctx()).unwrap();
        assert_eq!(step.outcome, MoveOutcome::Blocked);
        let first = &polymer.elements().get(0).unwrap().element;
        assert_eq!((first.start(), first.stop()), (1, 10));

        let step = polymer.move_element(1, &mut h.ctx()).unwrap();
        assert_eq!(step.outcome, MoveOutcome::Moved);
        let step = polymer.move_element(0, &mut h.ctx()).unwrap();
        assert_eq!(step.outcome, MoveOutcome::Moved);
    }

    #[test]
    fn test_mask_blocks_non_movers_and_yields_to_movers() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1.0)));
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("ecolipol", 1.0)));
        polymer.set_mask(MobileElement::mask(11, 100, ["rnapol"]));
        polymer.initialize(&mut h.tracker).unwrap();

        polymer
            .bind(MobileElement::polymerase("ecolipol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();
        let step = polymer.move_element(0, &mut h.ctx()).unwrap();
        assert_eq!(step.outcome, MoveOutcome::Blocked);
        assert_eq!(polymer.mask().start(), 11);

        let mut h2 = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1.0)));
        polymer.set_mask(MobileElement::mask(11, 100, ["rnapol"]));
        polymer.initialize(&mut h2.tracker).unwrap();
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h2.ctx())
            .unwrap();
        let step = polymer.move_element(0, &mut h2.ctx()).unwrap();
        assert_eq!(step.outcome, MoveOutcome::Moved);
        assert_eq!(polymer.mask().start(), 12);
    }

    #[test]
    fn test_terminator_releases_element() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();
        let mut steps = 0;
        while !polymer.elements().is_empty() {
            polymer.execute(&mut h.ctx()).unwrap();
            steps += 1;
        }
        // stop goes from 10 to 90.
        assert_eq!(steps, 80);
        assert_eq!(
            h.events,
            vec![PolymerEvent::Termination {
                polymer: PolymerId::Genome(0),
                element: "rnapol".to_string(),
                gene: String::new(),
            }]
        );
        assert_eq!(polymer.prop_sum(), 0.0);
        assert!(polymer.release_sites().iter().all(|s| !s.is_covered()));
    }

    #[test]
    fn test_readthrough_then_runoff() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1e7)));
        polymer.add_release_site(ReleaseSite::new("t1", 90, 91, rates("rnapol", 0.0)));
        polymer.initialize(&mut h.tracker).unwrap();
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap();

        while polymer.elements().get(0).unwrap().element.stop() < 90 {
            polymer.execute(&mut h.ctx()).unwrap();
        }
        assert!(polymer.release_sites()[0].readthrough());

        while !polymer.elements().is_empty() {
            polymer.execute(&mut h.ctx()).unwrap();
        }
        assert_eq!(
            h.events,
            vec![PolymerEvent::Termination {
                polymer: PolymerId::Genome(0),
                element: "rnapol".to_string(),
                gene: RUNOFF_GENE.to_string(),
            }]
        );
        // Leaving the polymer releases the terminator it was still covering.
        assert!(!polymer.release_sites()[0].readthrough());
    }

    #[test]
    fn test_reading_frame_gates_stop_codon() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 100);
        polymer.add_binding_site(BindingSite::rbs("gene1", 15, 19, 1e7));
        polymer.add_release_site(ReleaseSite::stop_codon("gene1", 39, 40, 1));
        polymer.initialize(&mut h.tracker).unwrap();

        let mut ribosome = MobileElement::polymerase(RIBOSOME, 10, 1.0);
        polymer.place(&mut ribosome, "gene1_rbs", &mut h.ctx()).unwrap();
        ribosome.set_reading_frame(Some(0));
        polymer.attach(ribosome, None).unwrap();
        assert_eq!(h.tracker.ribosomes("gene1"), 1);

        while !polymer.elements().is_empty() {
            polymer.execute(&mut h.ctx()).unwrap();
        }
        // Out of frame: the ribosome ignores the stop codon and runs off.
        assert_eq!(
            h.events,
            vec![PolymerEvent::Termination {
                polymer: PolymerId::Transcript(0),
                element: RIBOSOME.to_string(),
                gene: RUNOFF_GENE.to_string(),
            }]
        );
    }

    #[test]
    fn test_rnase_degrades_silently() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 40);
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 2, 12, 1.0));
        polymer.add_binding_site(BindingSite::rbs("gene1", 20, 24, 1e7));
        polymer.initialize(&mut h.tracker).unwrap();
        assert_eq!(h.tracker.transcripts("gene1"), 1);

        polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap();
        while !polymer.elements().is_empty() {
            let element = &polymer.elements().get(0).unwrap().element;
            assert_eq!(element.start(), 2);
            polymer.execute(&mut h.ctx()).unwrap();
        }
        assert!(h.events.is_empty());
        assert_eq!(h.tracker.transcripts("gene1"), 0);
        assert_eq!(h.tracker.count("gene1_rbs"), 0);
    }

    #[test]
    fn test_binding_covers_sites_under_footprint() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 60);
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 11, 21, 1.0));
        polymer.add_binding_site(BindingSite::rbs("gene1", 11, 26, 1e7));
        polymer.initialize(&mut h.tracker).unwrap();
        assert_eq!(h.tracker.count("__rnase_site"), 1);

        polymer
            .bind(MobileElement::polymerase(RIBOSOME, 10, 1.0), "gene1_rbs", &mut h.ctx())
            .unwrap();
        assert_eq!(h.tracker.count("__rnase_site"), 0);
        let err = polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoFreeSite { .. }));

        for _ in 0..11 {
            polymer.execute(&mut h.ctx()).unwrap();
        }
        assert_eq!(h.tracker.count("__rnase_site"), 1);
        assert_eq!(h.tracker.count("gene1_rbs"), 0);
    }

    #[test]
    fn test_rnase_covers_upstream_rbs_on_bind() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 60);
        polymer.add_binding_site(BindingSite::rbs("gene1", 10, 15, 1e7));
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 11, 21, 1.0));
        polymer.initialize(&mut h.tracker).unwrap();
        assert_eq!(h.tracker.transcripts("gene1"), 1);

        polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap();
        assert!(polymer.binding_sites()[0].is_covered());
        assert_eq!(h.tracker.count("gene1_rbs"), 0);
        assert_eq!(h.tracker.transcripts("gene1"), 0);
        let err = polymer
            .bind(MobileElement::polymerase(RIBOSOME, 10, 1.0), "gene1_rbs", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoFreeSite { .. }));

        while !polymer.elements().is_empty() {
            polymer.execute(&mut h.ctx()).unwrap();
        }
        assert_eq!(h.tracker.transcripts("gene1"), 0);
    }

    #[test]
    fn test_ribosome_covers_downstream_rnase_site_on_bind() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 60);
        polymer.add_binding_site(BindingSite::rbs("gene1", 10, 15, 1e7));
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 11, 21, 1.0));
        polymer.initialize(&mut h.tracker).unwrap();

        polymer
            .bind(MobileElement::polymerase(RIBOSOME, 10, 1.0), "gene1_rbs", &mut h.ctx())
            .unwrap();
        assert_eq!(h.tracker.count("__rnase_site"), 0);
        let err = polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::NoFreeSite { .. }));

        // [10, 19] -> [22, 31]: the trailing edge leaves [11, 21].
        for _ in 0..12 {
            assert_eq!(polymer.execute(&mut h.ctx()).unwrap().outcome, MoveOutcome::Moved);
        }
        assert_eq!(h.tracker.count("__rnase_site"), 1);
        polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap();
        assert_eq!(polymer.elements().len(), 2);
    }

    #[test]
    fn test_overlapping_promoters_hold_one_polymerase() {
        for (first, second) in [("p1", "p2"), ("p2", "p1")] {
            let mut h = Harness::new();
            let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
            polymer.add_binding_site(BindingSite::promoter("p1", 1, 10, rates("rnapol", 1.0)));
            polymer.add_binding_site(BindingSite::promoter("p2", 5, 14, rates("rnapol", 1.0)));
            polymer.initialize(&mut h.tracker).unwrap();

            polymer
                .bind(MobileElement::polymerase("rnapol", 10, 1.0), first, &mut h.ctx())
                .unwrap();
            assert_eq!(h.tracker.count(second), 0);
            let err = polymer
                .bind(MobileElement::polymerase("rnapol", 10, 1.0), second, &mut h.ctx())
                .unwrap_err();
            assert!(matches!(err, PolymerError::NoFreeSite { .. }));
        }
    }

    #[test]
    fn test_footprint_reaching_downstream_element_is_blocked() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        polymer.add_binding_site(BindingSite::promoter("p1", 1, 5, rates("rnapol", 1.0)));
        polymer.add_binding_site(BindingSite::promoter("p2", 8, 17, rates("rnapol", 1.0)));
        polymer.initialize(&mut h.tracker).unwrap();
        polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p2", &mut h.ctx())
            .unwrap();
        assert_eq!(h.tracker.count("p1"), 1);

        let err = polymer
            .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut h.ctx())
            .unwrap_err();
        assert!(matches!(err, PolymerError::SiteBlocked { .. }));
        assert!(!err.is_invariant_violation());
        assert_eq!(polymer.elements().len(), 1);
        assert_eq!(h.tracker.count("p1"), 1);
    }

    #[test]
    fn test_two_rnases_count_a_transcript_out_once() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 80);
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 2, 12, 1.0));
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site_internal", 30, 40, 1.0));
        polymer.add_binding_site(BindingSite::rbs("gene1", 50, 55, 1e7));
        polymer.initialize(&mut h.tracker).unwrap();
        assert_eq!(h.tracker.transcripts("gene1"), 1);

        polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site", &mut h.ctx())
            .unwrap();
        polymer
            .bind(MobileElement::rnase(10, 1.0), "__rnase_site_internal", &mut h.ctx())
            .unwrap();
        while !polymer.elements().is_empty() {
            polymer.execute(&mut h.ctx()).unwrap();
            assert!(h.tracker.transcripts("gene1") >= 0);
        }
        assert_eq!(h.tracker.transcripts("gene1"), 0);
        assert_eq!(h.tracker.count("gene1_rbs"), 0);
    }

    /// Adjacent elements never touch and no count drops below zero.
    fn assert_consistent(polymer: &Polymer, tracker: &SpeciesTracker) {
        let bound: Vec<_> = polymer.elements().iter().map(|b| &b.element).collect();
        for pair in bound.windows(2) {
            assert!(
                pair[0].stop() < pair[1].start(),
                "{} [{}, {}] runs into {} [{}, {}]",
                pair[0].name(),
                pair[0].start(),
                pair[0].stop(),
                pair[1].name(),
                pair[1].start(),
                pair[1].stop()
            );
        }
        for (name, count) in tracker.species() {
            assert!(count >= 0, "{name} dropped to {count}");
        }
        for gene in ["gene1", "gene2"] {
            assert!((0..=1).contains(&tracker.transcripts(gene)), "{gene}");
        }
        for name in ["gene1_rbs", "gene2_rbs", "__rnase_site", "__rnase_site_internal"] {
            let free = polymer
                .binding_sites()
                .iter()
                .filter(|site| site.name() == name && !site.is_covered())
                .count() as i64;
            assert_eq!(polymer.uncovered(name), free, "{name}");
            assert_eq!(tracker.count(name), free, "{name}");
        }
    }

    #[test]
    fn test_random_ribosomes_and_rnases_keep_polymer_consistent() {
        let mut h = Harness::new();
        let mut polymer = Polymer::new(PolymerId::Transcript(0), "rna", 1, 120);
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site", 2, 12, 1.0));
        polymer.add_binding_site(BindingSite::rbs("gene1", 10, 21, 1e7));
        polymer.add_binding_site(BindingSite::rnase_site("__rnase_site_internal", 40, 50, 1.0));
        polymer.add_binding_site(BindingSite::rbs("gene2", 45, 60, 1e7));
        polymer.add_release_site(ReleaseSite::new("t1", 100, 101, rates(RIBOSOME, 0.5)));
        polymer.initialize(&mut h.tracker).unwrap();
        assert_consistent(&polymer, &h.tracker);

        let mut actions = Xoshiro256PlusPlus::seed_from_u64(42);
        let sites = ["gene1_rbs", "gene2_rbs", "__rnase_site", "__rnase_site_internal"];
        let mut binds = 0;
        for _ in 0..3000 {
            let roll: f64 = actions.random();
            let site = sites[actions.random_range(0..sites.len())];
            let result = if roll < 0.15 {
                let element = if site.ends_with("_rbs") {
                    MobileElement::polymerase(RIBOSOME, 10, 1.0)
                } else {
                    MobileElement::rnase(10, 1.0)
                };
                polymer.bind(element, site, &mut h.ctx()).map(|()| binds += 1)
            } else {
                polymer.execute(&mut h.ctx()).map(|_| ())
            };
            match result {
                Ok(())
                | Err(PolymerError::NoFreeSite { .. })
                | Err(PolymerError::SiteBlocked { .. })
                | Err(PolymerError::ZeroPropensity { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
            assert_consistent(&polymer, &h.tracker);
        }
        assert!(binds > 0);
    }

    #[test]
    fn test_log_cover_rejects_negative_counts() {
        let mut h = Harness::new();
        let mut polymer = phage(&mut h.tracker);
        polymer.log_cover("p1", &mut h.tracker).unwrap();
        let err = polymer.log_cover("p1", &mut h.tracker).unwrap_err();
        assert!(matches!(err, PolymerError::NegativeUncovered { .. }));
        // Unknown names start at zero without touching the tracker.
        polymer.log_cover("p9", &mut h.tracker).unwrap();
        assert_eq!(h.tracker.count("p9"), 0);
    }

    #[test]
    fn test_set_weights_length() {
        let mut polymer = Polymer::new(PolymerId::Genome(0), "phage", 1, 100);
        let err = polymer.set_weights(vec![1.0; 99]).unwrap_err();
        assert_eq!(
            err,
            PolymerError::WeightLength {
                polymer: "phage".to_string(),
                expected: 100,
                actual: 99,
            }
        );
        assert_eq!(polymer.elements().weights().len(), 100);
        polymer.set_weights(vec![2.0; 100]).unwrap();
    }
}
