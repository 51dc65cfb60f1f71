//! Deterministic assignment of edges to partition buckets.
//!
//! Keys never depend on external randomness or on iteration order, so the
//! same edge lands in the same bucket across calls and process restarts.

use std::num::NonZeroUsize;

use xxhash_rust::xxh64::xxh64;

use crate::graph::Edge;

/// Fixed seed for the partition hash.
const PARTITION_HASH_SEED: u64 = 0x6669_6C74_726F_0001;

/// Bucket assignment policy.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use filtro_core::{Edge, Partitioner};
///
/// let k = NonZeroUsize::new(8).expect("non-zero");
/// let edge = Edge::new(3, 1, 6.0);
/// assert_eq!(Partitioner::WeightBucket.partition(&edge, k), 3);
/// assert_eq!(Partitioner::Single.partition(&edge, k), 0);
/// let bucket = Partitioner::Hash { salt: 0 }.partition(&edge, k);
/// assert!(bucket < 8);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Partitioner {
    /// Spread edges evenly by hashing the canonical endpoint pair.
    ///
    /// `salt` lets successive rounds regroup the same edges while keeping
    /// each round's assignment a pure function of the edge.
    Hash {
        /// Round-specific salt mixed into the hash.
        salt: u64,
    },
    /// Group edges of similar magnitude: `ceil(log2(weight + 1))`, clamped
    /// into `[0, K)`.
    WeightBucket,
    /// Send every edge to bucket `0`.
    Single,
}

impl Partitioner {
    /// Returns the bucket in `[0, partitions)` for `edge`.
    #[must_use]
    pub fn partition(self, edge: &Edge, partitions: NonZeroUsize) -> usize {
        let last = partitions.get().saturating_sub(1);
        match self {
            Self::Hash { salt } => hash_bucket(edge, salt, partitions),
            Self::WeightBucket => weight_bucket(edge.weight()).min(last),
            Self::Single => 0,
        }
    }
}

/// Non-negative hash of the canonical edge string modulo `partitions`.
#[must_use]
pub fn hash_bucket(edge: &Edge, salt: u64, partitions: NonZeroUsize) -> usize {
    let hash = xxh64(edge.canonical_key().as_bytes(), PARTITION_HASH_SEED ^ salt);
    let buckets = u64::try_from(partitions.get()).unwrap_or(u64::MAX);
    usize::try_from(hash % buckets).unwrap_or(0)
}

/// Magnitude bucket `ceil(log2(weight + 1))`.
///
/// Weights at or below zero, and non-finite weights, map to bucket `0`.
#[must_use]
pub fn weight_bucket(weight: f64) -> usize {
    if !weight.is_finite() || weight <= 0.0 {
        return 0;
    }
    let bucket = (weight + 1.0).log2().ceil();
    // `log2` of a finite f64 is below 1025, so the cast cannot truncate.
    bucket as usize
}
