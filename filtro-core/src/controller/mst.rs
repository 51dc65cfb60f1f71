//! Multi-round minimum spanning forest under the threshold policy.

use tracing::{info, instrument};

use crate::{
    error::EngineError,
    graph::Edge,
    partition::Partitioner,
    reduce::kruskal,
    substrate::{Substrate, counter},
    summary::{MstRun, RunSummary},
};

use super::{Engine, Policy, RoundState};

impl<S: Substrate> Engine<S> {
    /// Computes the minimum spanning forest of `edges` by repeated
    /// filtering.
    ///
    /// Every round hash-partitions the surviving edges, keeps each
    /// partition's Kruskal forest, and sums the accepted edges. Once that
    /// count is at most [`Engine::edge_threshold`], one single-bucket
    /// Kruskal pass merges the survivors into the final forest.
    ///
    /// # Errors
    /// Returns [`EngineError::NonConvergence`] when the threshold is not met
    /// within [`Engine::max_rounds`], and [`EngineError::RoundFailed`] when a
    /// stage fails in the substrate.
    #[instrument(name = "engine.mst", skip(self, edges), fields(edges = edges.len()))]
    pub fn minimum_spanning_forest(&self, edges: &[Edge]) -> Result<MstRun, EngineError> {
        let mut summary = RunSummary::new(Policy::Threshold);
        let mut state = RoundState::initial(edges.len() as u64);
        let mut current = edges.to_vec();

        for round in 1..=self.max_rounds.get() {
            let (survivors, accepted) = self.mst_round(&mut summary, round, &current)?;
            state = state.advance(accepted, summary.elapsed() - state.elapsed());
            current = survivors;
            if state.edge_count() <= self.edge_threshold {
                state = state.terminate();
                break;
            }
        }

        if !state.is_terminated() {
            return Err(EngineError::NonConvergence {
                policy: Policy::Threshold,
                rounds: state.round(),
            });
        }

        let final_edges = self.mst_merge(&mut summary, state.round(), &current)?;
        info!(
            rounds = state.round(),
            edges = final_edges.len(),
            "spanning forest merged"
        );
        Ok(MstRun {
            edges: final_edges,
            summary,
        })
    }

    /// One filtering round: returns the surviving forest edges and the
    /// aggregated accepted-edge counter.
    fn mst_round(
        &self,
        summary: &mut RunSummary,
        round: usize,
        edges: &[Edge],
    ) -> Result<(Vec<Edge>, u64), EngineError> {
        let partitioner = Partitioner::Hash {
            salt: round as u64,
        };
        let partitions = self.partitions;
        let output = self.run_stage(summary, round, "mst.local", edges.len(), |substrate| {
            substrate.map_reduce(
                "mst.local",
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(partitioner.partition(edge, partitions), edge.clone());
                },
                |_, records, counters| {
                    let forest = kruskal(records)?;
                    counters.increment(counter::ACCEPTED_EDGES, forest.accepted() as u64);
                    Ok(forest.into_edges())
                },
            )
        })?;
        let accepted = output.counters.get(counter::ACCEPTED_EDGES);
        Ok((output.records, accepted))
    }

    fn mst_merge(
        &self,
        summary: &mut RunSummary,
        round: usize,
        edges: &[Edge],
    ) -> Result<Vec<Edge>, EngineError> {
        let partitions = self.partitions;
        let output = self.run_stage(summary, round, "mst.merge", edges.len(), |substrate| {
            substrate.map_reduce(
                "mst.merge",
                edges,
                |edge: &Edge, emitter| {
                    emitter.emit(Partitioner::Single.partition(edge, partitions), edge.clone());
                },
                |_, records, counters| {
                    let forest = kruskal(records)?;
                    counters.increment(counter::ACCEPTED_EDGES, forest.accepted() as u64);
                    Ok(forest.into_edges())
                },
            )
        })?;
        Ok(output.records)
    }
}
