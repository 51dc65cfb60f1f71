//! Edge sampling calibrated to a memory budget.
//!
//! The inclusion probability `memory_threshold / (10 * edge_count)` keeps
//! the expected sample at a tenth of the budget. Draws come from a
//! [`SmallRng`] seeded per (round, partition), so re-running a partition
//! reproduces its sample exactly.

use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::graph::Edge;

/// SplitMix64 increment (the 64-bit golden ratio) used for seed derivation.
const SEED_SPACING: u64 = 0x9E37_79B9_7F4A_7C15;
const SPLITMIX_MULT_A: u64 = 0xBF58_476D_1CE4_E5B9;
const SPLITMIX_MULT_B: u64 = 0x94D0_49BB_1331_11EB;

#[inline]
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(SEED_SPACING);
    state = (state ^ (state >> 30)).wrapping_mul(SPLITMIX_MULT_A);
    state = (state ^ (state >> 27)).wrapping_mul(SPLITMIX_MULT_B);
    state ^ (state >> 31)
}

/// Derives an independent seed for one (round, partition) task.
#[must_use]
pub fn task_seed(base_seed: u64, round: usize, partition: usize) -> u64 {
    let round = splitmix64(base_seed ^ (round as u64).wrapping_add(1).wrapping_mul(SEED_SPACING));
    splitmix64(round ^ (partition as u64).wrapping_add(1).wrapping_mul(SEED_SPACING))
}

/// Builds the generator for one (round, partition) task.
#[must_use]
pub fn task_rng(base_seed: u64, round: usize, partition: usize) -> SmallRng {
    SmallRng::seed_from_u64(task_seed(base_seed, round, partition))
}

/// Sampling probability `memory_threshold / (10 * edge_count)`, clamped to
/// `[0, 1]`.
///
/// An empty edge set yields `1.0`.
///
/// # Examples
/// ```
/// use filtro_core::sampling_probability;
///
/// assert!((sampling_probability(100, 1000) - 0.01).abs() < 1e-12);
/// assert_eq!(sampling_probability(100, 5), 1.0);
/// ```
#[must_use]
pub fn sampling_probability(memory_threshold: u64, edge_count: u64) -> f64 {
    if edge_count == 0 {
        return 1.0;
    }
    let p = memory_threshold as f64 / (10.0 * edge_count as f64);
    p.clamp(0.0, 1.0)
}

/// Whether an edge was selected for the sequential matcher this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Proposal {
    /// The edge is part of the sample.
    Proposed,
    /// The edge stays out of this round's sample.
    NotProposed,
}

/// Classifies edges as proposed with probability `p`.
#[derive(Debug)]
pub struct Sampler {
    probability: f64,
    rng: SmallRng,
}

impl Sampler {
    /// Creates a sampler drawing from `rng`.
    #[must_use]
    pub fn new(probability: f64, rng: SmallRng) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Draws the proposal status for the next edge.
    pub fn classify(&mut self) -> Proposal {
        if self.probability >= 1.0 || self.rng.r#gen::<f64>() < self.probability {
            Proposal::Proposed
        } else {
            Proposal::NotProposed
        }
    }

    /// Returns the proposed subset of `edges`, preserving order.
    pub fn sample<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> Vec<Edge> {
        edges
            .into_iter()
            .filter(|_| self.classify() == Proposal::Proposed)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(100, 1000, 0.01)]
    #[case(1, 1, 0.1)]
    #[case(10, 1, 1.0)]
    #[case(1_000_000, 10, 1.0)]
    #[case(100, 0, 1.0)]
    fn probability_matches_budget_formula(
        #[case] memory: u64,
        #[case] edges: u64,
        #[case] expected: f64,
    ) {
        assert!((sampling_probability(memory, edges) - expected).abs() < 1e-12);
    }

    #[test]
    fn same_seed_reproduces_sample() {
        let edges: Vec<Edge> = (0..200).map(|i| Edge::unweighted(i, i + 1)).collect();
        let first = Sampler::new(0.3, task_rng(42, 1, 0)).sample(&edges);
        let second = Sampler::new(0.3, task_rng(42, 1, 0)).sample(&edges);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert!(first.len() < edges.len());
    }

    #[test]
    fn task_seeds_differ_across_rounds_and_partitions() {
        let base = task_seed(7, 1, 0);
        assert_ne!(base, task_seed(7, 2, 0));
        assert_ne!(base, task_seed(7, 1, 1));
        assert_ne!(base, task_seed(8, 1, 0));
    }

    #[rstest]
    #[case::all(1.0, 50)]
    #[case::none(0.0, 0)]
    fn extreme_probabilities_are_exact(#[case] probability: f64, #[case] expected: usize) {
        let edges: Vec<Edge> = (0..50).map(|i| Edge::unweighted(i, i + 1)).collect();
        let sample = Sampler::new(probability, task_rng(1, 1, 0)).sample(&edges);
        assert_eq!(sample.len(), expected);
    }
}
