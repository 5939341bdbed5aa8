//! Seeded train/held-out split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices assigned to each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` rows.
///
/// At least one row always stays in the training side. The same
/// `(n, test_fraction, seed)` always yields the same split.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let fraction = if test_fraction.is_finite() {
        test_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut test_n = ((n as f64) * fraction).ceil() as usize;
    if test_n >= n {
        test_n = n.saturating_sub(1);
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(test_n);
    Split {
        train,
        test: indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn split_is_disjoint_and_complete() {
        let split = train_test_split(100, 0.2, 42);
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let train: HashSet<_> = split.train.iter().copied().collect();
        assert!(split.test.iter().all(|idx| !train.contains(idx)));
        let mut all: Vec<_> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        assert_eq!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 7));
        assert_ne!(
            train_test_split(50, 0.2, 7).test,
            train_test_split(50, 0.2, 8).test
        );
    }

    #[test]
    fn small_inputs_keep_a_training_row() {
        let split = train_test_split(1, 0.5, 1);
        assert_eq!(split.train.len(), 1);
        assert!(split.test.is_empty());
        let split = train_test_split(3, 0.99, 1);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.test.len(), 2);
        assert_eq!(train_test_split(10, 0.0, 1).test.len(), 0);
        assert!(train_test_split(0, 0.2, 1).train.is_empty());
    }

    #[test]
    fn rounds_held_out_count_up() {
        assert_eq!(train_test_split(11, 0.2, 3).test.len(), 3);
    }
}
