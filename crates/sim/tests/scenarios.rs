//! Integration tests for single polymers driven by hand.

use expressim_sim::errors::PolymerError;
use expressim_sim::feature::{MobileElement, RUNOFF_GENE};
use expressim_sim::polymer::{Context, Genome, PolymerEvent, PolymerId, Transcript};
use expressim_sim::species::SpeciesTracker;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;

fn rnapol() -> BTreeMap<String, f64> {
    BTreeMap::from([("rnapol".to_string(), 1e7)])
}

fn genome_with_terminator(efficiency: f64) -> Genome {
    let mut genome = Genome::new("phage", 100);
    genome.add_promoter("p1", 1, 10, rnapol());
    genome.add_terminator(
        "t1",
        90,
        91,
        BTreeMap::from([("rnapol".to_string(), efficiency)]),
    );
    genome
}

#[test]
fn test_terminator_releases_polymerase() {
    let mut tracker = SpeciesTracker::new();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let mut events = Vec::new();
    let mut transcripts: Vec<Transcript> = Vec::new();

    let mut genome = genome_with_terminator(1.0);
    genome.initialize(&mut tracker).unwrap();
    assert_eq!(tracker.count("p1"), 1);

    let mut ctx = Context::new(&mut tracker, &mut rng, &mut events);
    genome
        .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut ctx, &mut transcripts)
        .unwrap();
    assert_eq!(ctx.tracker.count("p1"), 0);

    let mut moves = 0;
    while !genome.polymer().elements().is_empty() {
        genome.execute(&mut ctx, &mut transcripts).unwrap();
        moves += 1;
        if moves == 10 {
            // Trailing edge has left the promoter.
            assert_eq!(ctx.tracker.count("p1"), 1);
        }
    }
    assert_eq!(moves, 80);
    assert_eq!(tracker.count("p1"), 1);
    assert_eq!(transcripts.len(), 1);
    assert!(matches!(
        events.last(),
        Some(PolymerEvent::Termination { polymer: PolymerId::Genome(0), element, gene })
            if element == "rnapol" && gene.is_empty()
    ));
}

#[test]
fn test_readthrough_ends_in_runoff() {
    let mut tracker = SpeciesTracker::new();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let mut events = Vec::new();
    let mut transcripts: Vec<Transcript> = Vec::new();

    let mut genome = genome_with_terminator(0.0);
    genome.initialize(&mut tracker).unwrap();

    let mut ctx = Context::new(&mut tracker, &mut rng, &mut events);
    genome
        .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut ctx, &mut transcripts)
        .unwrap();

    let mut saw_readthrough = false;
    while !genome.polymer().elements().is_empty() {
        genome.execute(&mut ctx, &mut transcripts).unwrap();
        saw_readthrough |= genome.polymer().release_sites()[0].readthrough();
    }
    assert!(saw_readthrough);
    assert!(!genome.polymer().release_sites()[0].readthrough());

    let terminations: Vec<&PolymerEvent> = events
        .iter()
        .filter(|e| matches!(e, PolymerEvent::Termination { .. }))
        .collect();
    assert_eq!(terminations.len(), 1);
    assert!(matches!(
        terminations[0],
        PolymerEvent::Termination { gene, .. } if gene == RUNOFF_GENE
    ));
    // The whole genome has been transcribed.
    assert!(transcripts[0].polymer().mask().is_empty());
}

#[test]
fn test_built_transcript_sites_are_independent() {
    let mut tracker = SpeciesTracker::new();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut events = Vec::new();
    let mut transcripts: Vec<Transcript> = Vec::new();

    let mut genome = Genome::new("phage", 100);
    genome.add_promoter("p1", 1, 10, rnapol());
    genome.add_gene("gene1", 20, 40, 15, 19, 1e7);
    genome.add_weights(vec![1.0; 100]).unwrap();
    genome.initialize(&mut tracker).unwrap();

    let mut ctx = Context::new(&mut tracker, &mut rng, &mut events);
    genome
        .bind(MobileElement::polymerase("rnapol", 10, 1.0), "p1", &mut ctx, &mut transcripts)
        .unwrap();
    for _ in 0..12 {
        genome.execute(&mut ctx, &mut transcripts).unwrap();
    }
    assert!(genome.polymer().elements().get(0).unwrap().element.stop() > 20);
    // The live transcript has exposed its RBS.
    assert_eq!(ctx.tracker.count("gene1_rbs"), 1);
    assert!(!transcripts[0].polymer().binding_sites()[0].is_covered());

    let mut copy = genome.build_transcript(1, 100);
    let names: Vec<&str> = copy.polymer().binding_sites().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["gene1_rbs"]);
    assert_eq!(copy.polymer().release_sites().len(), 1);
    assert_eq!(copy.polymer().elements().weights(), vec![1.0; 100].as_slice());

    copy.initialize(ctx.tracker).unwrap();
    assert!(copy.polymer().binding_sites()[0].is_covered());
    assert!(!transcripts[0].polymer().binding_sites()[0].is_covered());
    assert_eq!(ctx.tracker.count("gene1_rbs"), 1);

    copy.shift_mask_by(19, ctx.tracker).unwrap();
    assert!(!copy.polymer().binding_sites()[0].is_covered());
    assert_eq!(ctx.tracker.count("gene1_rbs"), 2);
    assert_eq!(ctx.tracker.transcripts("gene1"), 2);
}

#[test]
fn test_wrong_weight_length_keeps_profile() {
    let mut genome = Genome::new("phage", 100);
    assert!(matches!(
        genome.add_weights(vec![2.0; 99]),
        Err(PolymerError::WeightLength { expected: 100, actual: 99, .. })
    ));
    assert_eq!(genome.transcript_weights(), vec![1.0; 100].as_slice());
    assert_eq!(genome.polymer().elements().weights(), vec![1.0; 100].as_slice());

    let mut transcript = Transcript::new("rna", 40);
    assert!(transcript.add_weights(vec![0.5; 41]).is_err());
    assert_eq!(transcript.polymer().elements().weights(), vec![1.0; 40].as_slice());
}
