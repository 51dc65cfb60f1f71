//! Builder for configuring [`Engine`] instances.

use std::num::{NonZeroU64, NonZeroUsize};

use crate::{
    Result,
    controller::Engine,
    error::EngineError,
    substrate::{InMemorySubstrate, Substrate},
};

/// Default base seed for randomised stages.
pub const DEFAULT_SEED: u64 = 0x5EED_F11E_0000_0001;

/// Configures and constructs [`Engine`] instances.
///
/// # Examples
/// ```
/// use filtro_core::EngineBuilder;
///
/// let engine = EngineBuilder::new()
///     .with_partitions(16)
///     .with_max_rounds(8)
///     .with_seed(42)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(engine.partitions().get(), 16);
/// assert_eq!(engine.max_rounds().get(), 8);
/// assert_eq!(engine.seed(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    partitions: usize,
    max_rounds: usize,
    edge_threshold: u64,
    memory_threshold: u64,
    seed: u64,
    attempts: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            partitions: 10,
            max_rounds: 20,
            edge_threshold: 1_000_000,
            memory_threshold: 1_000_000,
            seed: DEFAULT_SEED,
            attempts: 3,
        }
    }
}

impl EngineBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use filtro_core::EngineBuilder;
    ///
    /// let builder = EngineBuilder::new();
    /// assert_eq!(builder.partitions(), 10);
    /// assert_eq!(builder.max_rounds(), 20);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the partition count `K`.
    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Returns the configured partition count.
    #[must_use]
    #[rustfmt::skip]
    pub fn partitions(&self) -> usize { self.partitions }

    /// Overrides the round cap shared by every iterative policy.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Returns the configured round cap.
    #[must_use]
    #[rustfmt::skip]
    pub fn max_rounds(&self) -> usize { self.max_rounds }

    /// Sets the accepted-edge count at or below which the MST policy merges.
    ///
    /// # Examples
    /// ```
    /// use filtro_core::EngineBuilder;
    ///
    /// let builder = EngineBuilder::new().with_edge_threshold(500);
    /// assert_eq!(builder.edge_threshold(), 500);
    /// ```
    #[must_use]
    pub fn with_edge_threshold(mut self, threshold: u64) -> Self {
        self.edge_threshold = threshold;
        self
    }

    /// Returns the configured MST edge threshold.
    #[must_use]
    #[rustfmt::skip]
    pub fn edge_threshold(&self) -> u64 { self.edge_threshold }

    /// Sets the memory budget, in edges, of the sampling policy.
    #[must_use]
    pub fn with_memory_threshold(mut self, threshold: u64) -> Self {
        self.memory_threshold = threshold;
        self
    }

    /// Returns the configured memory threshold.
    #[must_use]
    #[rustfmt::skip]
    pub fn memory_threshold(&self) -> u64 { self.memory_threshold }

    /// Sets the base seed from which every randomised task derives its own.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the configured base seed.
    #[must_use]
    #[rustfmt::skip]
    pub fn seed(&self) -> u64 { self.seed }

    /// Sets how many times the in-memory substrate tries each task.
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the configured attempt budget.
    #[must_use]
    #[rustfmt::skip]
    pub fn attempts(&self) -> usize { self.attempts }

    /// Validates the configuration and constructs an [`Engine`] backed by
    /// the [`InMemorySubstrate`].
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidPartitions`],
    /// [`EngineError::InvalidMaxRounds`],
    /// [`EngineError::InvalidMemoryThreshold`] or
    /// [`EngineError::InvalidAttempts`] when the matching value is zero.
    ///
    /// # Examples
    /// ```
    /// use filtro_core::{EngineBuilder, EngineError};
    ///
    /// let err = EngineBuilder::new().with_partitions(0).build().unwrap_err();
    /// assert!(matches!(err, EngineError::InvalidPartitions { got: 0 }));
    /// ```
    pub fn build(self) -> Result<Engine> {
        let attempts = NonZeroUsize::new(self.attempts)
            .ok_or(EngineError::InvalidAttempts { got: self.attempts })?;
        self.build_with_substrate(InMemorySubstrate::new(attempts))
    }

    /// Validates the configuration and constructs an [`Engine`] that runs
    /// its stages on `substrate`.
    ///
    /// The attempt budget is not validated here; retries belong to the
    /// supplied substrate.
    ///
    /// # Errors
    /// Returns the same validation errors as [`EngineBuilder::build`],
    /// except [`EngineError::InvalidAttempts`].
    pub fn build_with_substrate<S: Substrate>(self, substrate: S) -> Result<Engine<S>> {
        let partitions = NonZeroUsize::new(self.partitions).ok_or(
            EngineError::InvalidPartitions {
                got: self.partitions,
            },
        )?;
        let max_rounds = NonZeroUsize::new(self.max_rounds).ok_or(
            EngineError::InvalidMaxRounds {
                got: self.max_rounds,
            },
        )?;
        let memory_threshold = NonZeroU64::new(self.memory_threshold).ok_or(
            EngineError::InvalidMemoryThreshold {
                got: self.memory_threshold,
            },
        )?;

        Ok(Engine {
            partitions,
            max_rounds,
            edge_threshold: self.edge_threshold,
            memory_threshold,
            seed: self.seed,
            substrate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::error::EngineErrorCode;

    #[test]
    fn defaults_build() {
        let engine = EngineBuilder::new().build().expect("defaults are valid");
        assert_eq!(engine.partitions().get(), 10);
        assert_eq!(engine.max_rounds().get(), 20);
        assert_eq!(engine.edge_threshold(), 1_000_000);
        assert_eq!(engine.memory_threshold().get(), 1_000_000);
        assert_eq!(engine.seed(), DEFAULT_SEED);
        assert_eq!(engine.substrate().attempts().get(), 3);
    }

    #[rstest]
    #[case::partitions(EngineBuilder::new().with_partitions(0), EngineErrorCode::InvalidPartitions)]
    #[case::rounds(EngineBuilder::new().with_max_rounds(0), EngineErrorCode::InvalidMaxRounds)]
    #[case::memory(
        EngineBuilder::new().with_memory_threshold(0),
        EngineErrorCode::InvalidMemoryThreshold
    )]
    #[case::attempts(EngineBuilder::new().with_attempts(0), EngineErrorCode::InvalidAttempts)]
    fn zero_values_are_rejected(#[case] builder: EngineBuilder, #[case] code: EngineErrorCode) {
        let err = builder.build().expect_err("zero must be rejected");
        assert_eq!(err.code(), code);
    }

    #[test]
    fn zero_edge_threshold_is_allowed() {
        let engine = EngineBuilder::new()
            .with_edge_threshold(0)
            .build()
            .expect("a zero threshold forces a merge only when no edge survives");
        assert_eq!(engine.edge_threshold(), 0);
    }
}
