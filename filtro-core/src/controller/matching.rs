//! Matching runs: sampling-threshold maximal matching and the single-pass
//! weighted and randomised variants.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use crate::{
    error::EngineError,
    graph::{Edge, Vertex},
    partition::Partitioner,
    reduce::{SequentialMatcher, randomized_greedy_matching, weight_ordered_matching},
    sampling::{Sampler, sampling_probability, task_rng},
    substrate::{SideChannel, Substrate, counter},
    summary::{MatchingRun, RunSummary},
};

use super::{Engine, Policy, RoundState, record_malformed};

/// Name of the per-round broadcast holding the vertices matched so far.
pub const MATCHED_VERTICES_CHANNEL: &str = "matched_vertices";

impl<S: Substrate> Engine<S> {
    /// Computes a maximal matching with the sampling-threshold policy.
    ///
    /// Each round samples the surviving edges with probability
    /// `memory_threshold / (10 * surviving)`, matches the sample with a
    /// [`SequentialMatcher`], broadcasts the matched vertices and filters
    /// every edge that touches one. Once at most `memory_threshold` edges
    /// survive, a final sequential pass matches the remainder. Self-loops
    /// can never be matched and are dropped up front.
    ///
    /// # Errors
    /// Returns [`EngineError::NonConvergence`] when edges still exceed the
    /// threshold after [`Engine::max_rounds`] rounds,
    /// [`EngineError::MissingBroadcast`] when the filter cannot read the
    /// matched-vertex set, and [`EngineError::RoundFailed`] when a stage
    /// fails in the substrate.
    #[instrument(name = "engine.matching", skip(self, edges), fields(edges = edges.len()))]
    pub fn maximal_matching(&self, edges: &[Edge]) -> Result<MatchingRun, EngineError> {
        let mut summary = RunSummary::new(Policy::SamplingThreshold);
        let mut remaining: Vec<Edge> = edges
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .cloned()
            .collect();
        let mut state = RoundState::initial(remaining.len() as u64);
        let channel = SideChannel::new(MATCHED_VERTICES_CHANNEL);
        let mut pairs = Vec::new();

        while !remaining.is_empty() {
            let round = state.round() + 1;
            if round > self.max_rounds.get() {
                return Err(EngineError::NonConvergence {
                    policy: Policy::SamplingThreshold,
                    rounds: state.round(),
                });
            }

            let before = summary.elapsed();
            let proposed =
                self.sample_stage(&mut summary, round, &remaining, state.edge_count())?;
            let mut matcher = SequentialMatcher::new();
            matcher.offer_all(&proposed);
            let (accepted, matched) = matcher.into_parts();
            debug!(
                round,
                proposed = proposed.len(),
                accepted = accepted.len(),
                "sample matched"
            );
            pairs.extend(accepted);

            channel.publish(round, matched);
            let filtered = self.filter_stage(&mut summary, &channel, round, &remaining);
            channel.retire(round);
            let (survivors, surviving) = filtered?;

            remaining = survivors;
            state = state.advance(surviving, summary.elapsed() - before);
            if surviving <= self.memory_threshold.get() {
                state = state.terminate();
                break;
            }
        }

        if !remaining.is_empty() {
            pairs.extend(self.sequential_stage(&mut summary, state.round(), &remaining)?);
        }
        info!(rounds = state.round(), pairs = pairs.len(), "matching completed");
        Ok(MatchingRun { pairs, summary })
    }

    /// Drops every edge touching a vertex broadcast on `channel` for
    /// `round`, returning the survivors and the surviving-edge counter.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingBroadcast`] when nothing was published
    /// for `round`, and [`EngineError::RoundFailed`] for other stage
    /// failures.
    pub fn filter_round(
        &self,
        channel: &SideChannel<HashSet<Vertex>>,
        round: usize,
        edges: &[Edge],
    ) -> Result<(Vec<Edge>, u64), EngineError> {
        let mut summary = RunSummary::new(Policy::SamplingThreshold);
        self.filter_stage(&mut summary, channel, round, edges)
    }

    fn sample_stage(
        &self,
        summary: &mut RunSummary,
        round: usize,
        edges: &[Edge],
        edge_count: u64,
    ) -> Result<Vec<Edge>, EngineError> {
        const STAGE: &str = "matching.sample";
        let probability = sampling_probability(self.memory_threshold.get(), edge_count);
        let partitioner = Partitioner::Hash {
            salt: round as u64,
        };
        let partitions = self.partitions;
        let seed = self.seed;
        let output = self.run_stage(summary, round, STAGE, edges.len(), |substrate| {
            substrate.map_reduce(
                STAGE,
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(partitioner.partition(edge, partitions), edge.clone());
                },
                |partition: &usize, records: &[Edge], counters| {
                    let mut sampler = Sampler::new(probability, task_rng(seed, round, *partition));
                    let sample = sampler.sample(records);
                    counters.increment(counter::PROPOSED_EDGES, sample.len() as u64);
                    Ok(sample)
                },
            )
        })?;

        let mut proposed = output.records;
        if proposed.is_empty() {
            let fallback = edges
                .iter()
                .min_by(|left, right| {
                    (left.lower(), left.higher()).cmp(&(right.lower(), right.higher()))
                })
                .cloned();
            if let Some(edge) = fallback {
                debug!(
                    round,
                    probability,
                    edge = %edge.canonical_key(),
                    "empty sample; proposing smallest edge"
                );
                proposed.push(edge);
            }
        }
        Ok(proposed)
    }

    fn filter_stage(
        &self,
        summary: &mut RunSummary,
        channel: &SideChannel<HashSet<Vertex>>,
        round: usize,
        edges: &[Edge],
    ) -> Result<(Vec<Edge>, u64), EngineError> {
        const STAGE: &str = "matching.filter";
        let partitioner = Partitioner::Hash {
            salt: round as u64,
        };
        let partitions = self.partitions;
        let output = self.run_stage(summary, round, STAGE, edges.len(), |substrate| {
            substrate.map_reduce(
                STAGE,
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(partitioner.partition(edge, partitions), edge.clone());
                },
                |_, records: &[Edge], counters| {
                    let matched = channel.fetch(round)?;
                    let kept: Vec<Edge> = records
                        .iter()
                        .filter(|edge| {
                            !matched.contains(edge.lower()) && !matched.contains(edge.higher())
                        })
                        .cloned()
                        .collect();
                    counters.increment(counter::REMAINING_EDGES, kept.len() as u64);
                    Ok(kept)
                },
            )
        })?;
        let surviving = output.counters.get(counter::REMAINING_EDGES);
        Ok((output.records, surviving))
    }

    fn sequential_stage(
        &self,
        summary: &mut RunSummary,
        round: usize,
        edges: &[Edge],
    ) -> Result<Vec<Edge>, EngineError> {
        const STAGE: &str = "matching.final";
        let partitions = self.partitions;
        let output = self.run_stage(summary, round, STAGE, edges.len(), |substrate| {
            substrate.map_reduce(
                STAGE,
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(Partitioner::Single.partition(edge, partitions), edge.clone());
                },
                |_, records: &[Edge], counters| {
                    let mut matcher = SequentialMatcher::new();
                    let accepted = matcher.offer_all(records);
                    counters.increment(counter::MATCHED_PAIRS, accepted as u64);
                    Ok(matcher.into_parts().0)
                },
            )
        })?;
        Ok(output.records)
    }

    /// Approximate weighted matching in one partitioned pass.
    ///
    /// Edges are grouped by weight magnitude, each bucket is matched in
    /// ascending weight order, and a single-bucket pass over the bucket
    /// results, again in ascending weight order, resolves vertices matched
    /// in more than one bucket. Edges with a non-positive weight are skipped
    /// and counted as malformed.
    ///
    /// # Errors
    /// Returns [`EngineError::RoundFailed`] when a stage fails in the
    /// substrate.
    #[instrument(
        name = "engine.weighted_matching",
        skip(self, edges),
        fields(edges = edges.len()),
    )]
    pub fn weighted_matching(&self, edges: &[Edge]) -> Result<MatchingRun, EngineError> {
        let mut summary = RunSummary::new(Policy::SinglePass);
        let (positive, rejected): (Vec<Edge>, Vec<Edge>) =
            edges.iter().cloned().partition(|edge| edge.weight() > 0.0);
        if !rejected.is_empty() {
            warn!(
                skipped = rejected.len(),
                "skipped edges with non-positive weight"
            );
            summary.add_malformed(rejected.len() as u64);
            record_malformed(rejected.len() as u64);
        }

        const BUCKET_STAGE: &str = "weighted.bucket";
        const MERGE_STAGE: &str = "weighted.merge";
        let partitions = self.partitions;
        let buckets = self.run_stage(&mut summary, 1, BUCKET_STAGE, positive.len(), |substrate| {
            substrate.map_reduce(
                BUCKET_STAGE,
                &positive,
                |edge: &Edge, emitter| {
                    let bucket = Partitioner::WeightBucket.partition(edge, partitions);
                    emitter.emit(bucket, edge.clone());
                },
                |_, records: &[Edge], counters| {
                    let matching = weight_ordered_matching(records);
                    counters.increment(counter::MATCHED_PAIRS, matching.len() as u64);
                    Ok(matching.into_edges())
                },
            )
        })?;

        let candidates = buckets.records;
        let merged = self.run_stage(&mut summary, 1, MERGE_STAGE, candidates.len(), |substrate| {
            substrate.map_reduce(
                MERGE_STAGE,
                &candidates,
                |edge: &Edge, emitter| {
                    emitter.emit(Partitioner::Single.partition(edge, partitions), edge.clone());
                },
                |_, records: &[Edge], counters| {
                    let matching = weight_ordered_matching(records);
                    counters.increment(counter::MATCHED_PAIRS, matching.len() as u64);
                    Ok(matching.into_edges())
                },
            )
        })?;

        info!(pairs = merged.records.len(), "weighted matching completed");
        Ok(MatchingRun {
            pairs: merged.records,
            summary,
        })
    }

    /// Randomised greedy maximal matching in one single-bucket pass.
    ///
    /// The vertex visitation order is drawn from [`Engine::seed`], so equal
    /// seeds give equal matchings.
    ///
    /// # Errors
    /// Returns [`EngineError::RoundFailed`] when the stage fails in the
    /// substrate.
    #[instrument(
        name = "engine.greedy_matching",
        skip(self, edges),
        fields(edges = edges.len()),
    )]
    pub fn greedy_matching(&self, edges: &[Edge]) -> Result<MatchingRun, EngineError> {
        const STAGE: &str = "greedy.local";
        let mut summary = RunSummary::new(Policy::SinglePass);
        let partitions = self.partitions;
        let seed = self.seed;
        let output = self.run_stage(&mut summary, 1, STAGE, edges.len(), |substrate| {
            substrate.map_reduce(
                STAGE,
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(Partitioner::Single.partition(edge, partitions), edge.clone());
                },
                |partition: &usize, records: &[Edge], counters| {
                    let mut rng = task_rng(seed, 1, *partition);
                    let matching = randomized_greedy_matching(records, &mut rng);
                    counters.increment(counter::MATCHED_PAIRS, matching.len() as u64);
                    Ok(matching.into_edges())
                },
            )
        })?;
        info!(pairs = output.records.len(), "greedy matching completed");
        Ok(MatchingRun {
            pairs: output.records,
            summary,
        })
    }
}
