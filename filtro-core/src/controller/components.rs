//! Connected components under the fixed-point policy.

use std::collections::BTreeSet;

use tracing::{info, instrument};

use crate::{
    error::EngineError,
    graph::{Vertex, VertexRecord},
    reduce::{canonicalize_components, emit_fragments, union_fragments},
    substrate::{Substrate, counter},
    summary::{ComponentsRun, RunSummary},
};

use super::{Engine, Policy, RoundState};

impl<S: Substrate> Engine<S> {
    /// Computes connected components by hash-to-min propagation.
    ///
    /// Rounds repeat until a round's output equals the previous round's
    /// output; the first round can never terminate the run. The converged
    /// records are then collapsed into one [`crate::Component`] per
    /// cluster.
    ///
    /// # Errors
    /// Returns [`EngineError::NonConvergence`] when no fixed point is
    /// reached within [`Engine::max_rounds`], and
    /// [`EngineError::RoundFailed`] when a stage fails in the substrate.
    #[instrument(
        name = "engine.components",
        skip(self, records),
        fields(records = records.len()),
    )]
    pub fn connected_components(
        &self,
        records: &[VertexRecord],
    ) -> Result<ComponentsRun, EngineError> {
        let mut summary = RunSummary::new(Policy::FixedPoint);
        let mut state = RoundState::initial(records.len() as u64);
        let mut converged: Option<Vec<VertexRecord>> = None;
        let mut current = records.to_vec();
        let mut last_change = 0;

        for round in 1..=self.max_rounds.get() {
            let before = summary.elapsed();
            let mut next = self.hash_to_min_stage(&mut summary, round, &current)?;
            next.sort_unstable();
            state = state.advance(next.len() as u64, summary.elapsed() - before);

            if round > 1 && next == current {
                state = state.terminate();
                converged = Some(next);
                break;
            }
            last_change = round;
            current = next;
        }

        let Some(converged) = converged else {
            return Err(EngineError::NonConvergence {
                policy: Policy::FixedPoint,
                rounds: state.round(),
            });
        };
        summary.set_converged_at(last_change);

        let components = canonicalize_components(&converged);
        info!(
            rounds = state.round(),
            converged_at = last_change,
            components = components.len(),
            "fixed point reached"
        );
        Ok(ComponentsRun {
            records: converged,
            components,
            summary,
        })
    }

    /// Runs a single hash-to-min round over `records` and returns the
    /// merged cluster records in ascending vertex order.
    ///
    /// # Errors
    /// Returns [`EngineError::RoundFailed`] when the stage fails in the
    /// substrate.
    pub fn hash_to_min_round(
        &self,
        round: usize,
        records: &[VertexRecord],
    ) -> Result<Vec<VertexRecord>, EngineError> {
        let mut summary = RunSummary::new(Policy::FixedPoint);
        self.hash_to_min_stage(&mut summary, round, records)
    }

    fn hash_to_min_stage(
        &self,
        summary: &mut RunSummary,
        round: usize,
        records: &[VertexRecord],
    ) -> Result<Vec<VertexRecord>, EngineError> {
        const STAGE: &str = "components.propagate";
        let output = self.run_stage(summary, round, STAGE, records.len(), |substrate| {
            substrate.map_reduce(
                STAGE,
                records,
                |record: &VertexRecord, emitter| {
                    for (key, fragment) in emit_fragments(record) {
                        emitter.emit(key, fragment);
                    }
                },
                |key: &Vertex, fragments: &[BTreeSet<Vertex>], counters| {
                    counters.increment(counter::CLUSTER_RECORDS, 1);
                    Ok(vec![union_fragments(key, fragments)])
                },
            )
        })?;
        Ok(output.records)
    }
}
