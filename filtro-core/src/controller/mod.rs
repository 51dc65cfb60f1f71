//! Round controller.
//!
//! [`Engine`] drives rounds through a [`Substrate`]: each round partitions
//! the current records, reduces every partition independently, and hands
//! the merged output to the termination check of the active [`Policy`].
//! Rounds run strictly one after another; all state passed between them is
//! an explicit [`RoundState`] value.

mod builder;
mod components;
mod matching;
mod mst;

use std::{
    fmt,
    num::{NonZeroU64, NonZeroUsize},
    time::{Duration, Instant},
};

use tracing::info;

use crate::{
    error::{EngineError, SubstrateError},
    substrate::{InMemorySubstrate, StageOutput, Substrate},
    summary::{RoundReport, RunSummary},
};

pub use self::{
    builder::{DEFAULT_SEED, EngineBuilder},
    matching::MATCHED_VERTICES_CHANNEL,
};

/// Termination policy driving a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Policy {
    /// Stop once a round accepts at most `threshold` edges, then merge.
    Threshold,
    /// Stop once a round's output equals the previous round's output.
    FixedPoint,
    /// Sample, match and filter until the surviving edges fit in memory.
    SamplingThreshold,
    /// One partitioned pass followed by a merge.
    SinglePass,
}

impl Policy {
    /// Stable lowercase name used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::FixedPoint => "fixed-point",
            Self::SamplingThreshold => "sampling-threshold",
            Self::SinglePass => "single-pass",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State threaded from one round boundary to the next.
///
/// The records themselves stay with the driving loop; the state carries
/// the counters the termination check reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundState {
    round: usize,
    edge_count: u64,
    elapsed: Duration,
    terminated: bool,
}

impl RoundState {
    /// State before the first round over `edge_count` records.
    #[must_use]
    pub const fn initial(edge_count: u64) -> Self {
        Self {
            round: 0,
            edge_count,
            elapsed: Duration::ZERO,
            terminated: false,
        }
    }

    /// State after a round that left `edge_count` records and took `elapsed`.
    #[must_use]
    pub fn advance(self, edge_count: u64, elapsed: Duration) -> Self {
        Self {
            round: self.round + 1,
            edge_count,
            elapsed: self.elapsed + elapsed,
            terminated: false,
        }
    }

    /// Marks the run as finished.
    #[must_use]
    pub const fn terminate(self) -> Self {
        Self {
            terminated: true,
            ..self
        }
    }

    /// Index of the last completed round, `0` before the first.
    #[must_use]
    #[rustfmt::skip]
    pub const fn round(&self) -> usize { self.round }

    /// Record count reported by the last completed round.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_count(&self) -> u64 { self.edge_count }

    /// Time spent in completed rounds.
    #[must_use]
    #[rustfmt::skip]
    pub const fn elapsed(&self) -> Duration { self.elapsed }

    /// Whether the termination condition has been met.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_terminated(&self) -> bool { self.terminated }
}

/// Entry point for running graph reductions.
///
/// # Examples
/// ```
/// use filtro_core::{Edge, EngineBuilder};
///
/// let engine = EngineBuilder::new()
///     .with_partitions(4)
///     .build()
///     .expect("configuration is valid");
/// let edges = vec![Edge::new(1, 2, 1.0), Edge::new(2, 3, 2.0), Edge::new(1, 3, 3.0)];
/// let run = engine.minimum_spanning_forest(&edges).expect("run succeeds");
/// assert_eq!(run.edges.len(), 2);
/// assert_eq!(run.total_weight(), 3.0);
/// ```
#[derive(Clone, Debug)]
pub struct Engine<S = InMemorySubstrate> {
    partitions: NonZeroUsize,
    max_rounds: NonZeroUsize,
    edge_threshold: u64,
    memory_threshold: NonZeroU64,
    seed: u64,
    substrate: S,
}

impl<S: Substrate> Engine<S> {
    /// Returns the partition count `K`.
    #[must_use]
    #[rustfmt::skip]
    pub fn partitions(&self) -> NonZeroUsize { self.partitions }

    /// Returns the round cap.
    #[must_use]
    #[rustfmt::skip]
    pub fn max_rounds(&self) -> NonZeroUsize { self.max_rounds }

    /// Returns the accepted-edge threshold of the MST policy.
    #[must_use]
    #[rustfmt::skip]
    pub fn edge_threshold(&self) -> u64 { self.edge_threshold }

    /// Returns the memory threshold of the sampling policy.
    #[must_use]
    #[rustfmt::skip]
    pub fn memory_threshold(&self) -> NonZeroU64 { self.memory_threshold }

    /// Returns the base seed for randomised stages.
    #[must_use]
    #[rustfmt::skip]
    pub fn seed(&self) -> u64 { self.seed }

    /// Returns the substrate executing the stages.
    #[must_use]
    #[rustfmt::skip]
    pub fn substrate(&self) -> &S { &self.substrate }

    /// Times `stage`, records its report and maps substrate failures onto
    /// the round and policy.
    fn run_stage<O>(
        &self,
        summary: &mut RunSummary,
        round: usize,
        stage: &'static str,
        input_records: usize,
        run: impl FnOnce(&S) -> Result<StageOutput<O>, SubstrateError>,
    ) -> Result<StageOutput<O>, EngineError> {
        let started = Instant::now();
        let output = run(&self.substrate)
            .map_err(|error| EngineError::from_round(round, summary.policy(), error))?;
        let elapsed = started.elapsed();
        info!(
            policy = %summary.policy(),
            round,
            stage,
            input = input_records,
            output = output.records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "stage completed"
        );
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("filtro_rounds_total", "stage" => stage).increment(1);
            metrics::histogram!("filtro_round_records", "stage" => stage)
                .record(output.records.len() as f64);
        }
        summary.record(RoundReport::new(
            round,
            stage,
            input_records,
            output.records.len(),
            elapsed,
        ));
        Ok(output)
    }
}

#[cfg(feature = "metrics")]
pub(crate) fn record_malformed(count: u64) {
    if count > 0 {
        metrics::counter!("filtro_malformed_records_total").increment(count);
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_malformed(_count: u64) {}
