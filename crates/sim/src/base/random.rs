//! Weighted random draws used for stochastic selection.

use rand::Rng;

/// Draw an index with probability proportional to its weight.
///
/// Returns `None` when there is nothing to choose from (empty slice or a
/// non-positive total weight).
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }

    let r = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if r < cumulative {
            return Some(i);
        }
    }

    // Floating point slack: fall back to the last index with positive weight.
    weights.iter().rposition(|&w| w > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_empty_or_zero_weights() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        assert_eq!(weighted_index(&[], &mut rng), None);
        assert_eq!(weighted_index(&[0.0, 0.0], &mut rng), None);
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        for _ in 0..1000 {
            let i = weighted_index(&[1.0, 0.0, 3.0], &mut rng).unwrap();
            assert_ne!(i, 1);
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(123);
        let mut counts = [0usize; 2];
        let n = 20_000;
        for _ in 0..n {
            counts[weighted_index(&[1.0, 3.0], &mut rng).unwrap()] += 1;
        }
        let frac = counts[1] as f64 / n as f64;
        assert!((frac - 0.75).abs() < 0.02, "frac = {frac}");
    }
}
