//! Run results and per-round reports returned by [`crate::Engine`].

use std::time::Duration;

use crate::{
    controller::Policy,
    graph::{Edge, VertexRecord},
    reduce::Component,
};

/// Timing and size of one executed stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    round: usize,
    stage: &'static str,
    input_records: usize,
    output_records: usize,
    elapsed: Duration,
}

impl RoundReport {
    pub(crate) fn new(
        round: usize,
        stage: &'static str,
        input_records: usize,
        output_records: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            round,
            stage,
            input_records,
            output_records,
            elapsed,
        }
    }

    /// Round index, starting at `1`.
    #[must_use]
    #[rustfmt::skip]
    pub fn round(&self) -> usize { self.round }

    /// Name of the stage that produced this report.
    #[must_use]
    #[rustfmt::skip]
    pub fn stage(&self) -> &'static str { self.stage }

    /// Records consumed by the stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn input_records(&self) -> usize { self.input_records }

    /// Records produced by the stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn output_records(&self) -> usize { self.output_records }

    /// Wall-clock duration of the stage.
    #[must_use]
    #[rustfmt::skip]
    pub fn elapsed(&self) -> Duration { self.elapsed }
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    policy: Policy,
    rounds: usize,
    reports: Vec<RoundReport>,
    malformed: u64,
    converged_at: Option<usize>,
    elapsed: Duration,
}

impl RunSummary {
    pub(crate) fn new(policy: Policy) -> Self {
        Self {
            policy,
            rounds: 0,
            reports: Vec::new(),
            malformed: 0,
            converged_at: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, report: RoundReport) {
        self.rounds = self.rounds.max(report.round);
        self.elapsed += report.elapsed;
        self.reports.push(report);
    }

    pub(crate) fn set_converged_at(&mut self, round: usize) {
        self.converged_at = Some(round);
    }

    /// Adds `count` malformed records, such as lines skipped while loading.
    pub fn add_malformed(&mut self, count: u64) {
        self.malformed = self.malformed.saturating_add(count);
    }

    /// Policy that drove the run.
    #[must_use]
    #[rustfmt::skip]
    pub fn policy(&self) -> Policy { self.policy }

    /// Number of rounds executed.
    #[must_use]
    #[rustfmt::skip]
    pub fn rounds(&self) -> usize { self.rounds }

    /// Stage reports in execution order.
    #[must_use]
    #[rustfmt::skip]
    pub fn reports(&self) -> &[RoundReport] { &self.reports }

    /// Malformed records skipped during loading or by the engine.
    #[must_use]
    #[rustfmt::skip]
    pub fn malformed(&self) -> u64 { self.malformed }

    /// First round whose output equals the final output, for fixed-point
    /// runs.
    #[must_use]
    #[rustfmt::skip]
    pub fn converged_at(&self) -> Option<usize> { self.converged_at }

    /// Total time spent in stages.
    #[must_use]
    #[rustfmt::skip]
    pub fn elapsed(&self) -> Duration { self.elapsed }

    /// Mean stage time per executed round, or `None` when nothing ran.
    #[must_use]
    pub fn average_round_time(&self) -> Option<Duration> {
        let rounds = u32::try_from(self.rounds).ok().filter(|&rounds| rounds > 0)?;
        Some(self.elapsed / rounds)
    }
}

/// Minimum spanning forest produced by the threshold policy.
#[derive(Clone, Debug, PartialEq)]
pub struct MstRun {
    /// Forest edges in ascending weight order.
    pub edges: Vec<Edge>,
    /// Run summary.
    pub summary: RunSummary,
}

impl MstRun {
    /// Sum of the forest's edge weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(Edge::weight).sum()
    }
}

/// Connected components produced by the fixed-point policy.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentsRun {
    /// Cluster records of the converged round, ascending by vertex.
    pub records: Vec<VertexRecord>,
    /// Canonical components derived from `records`.
    pub components: Vec<Component>,
    /// Run summary.
    pub summary: RunSummary,
}

/// Matching produced by any matching policy.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchingRun {
    /// Accepted pairs in acceptance order.
    pub pairs: Vec<Edge>,
    /// Run summary.
    pub summary: RunSummary,
}

impl MatchingRun {
    /// Sum of the accepted pair weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.pairs.iter().map(Edge::weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_track_the_highest_reported_round() {
        let mut summary = RunSummary::new(Policy::Threshold);
        summary.record(RoundReport::new(1, "mst.local", 10, 6, Duration::from_millis(30)));
        summary.record(RoundReport::new(2, "mst.local", 6, 3, Duration::from_millis(10)));
        summary.record(RoundReport::new(2, "mst.merge", 3, 3, Duration::from_millis(20)));
        assert_eq!(summary.rounds(), 2);
        assert_eq!(summary.elapsed(), Duration::from_millis(60));
        assert_eq!(summary.average_round_time(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn empty_summary_has_no_average() {
        let mut summary = RunSummary::new(Policy::SinglePass);
        summary.add_malformed(2);
        summary.add_malformed(3);
        assert_eq!(summary.malformed(), 5);
        assert_eq!(summary.average_round_time(), None);
    }
}
