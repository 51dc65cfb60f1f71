//! Key-based grouping and reduction.
//!
//! The engine hands keyed records to a [`Substrate`], which guarantees that
//! every record sharing a key reaches exactly one successful reducer
//! invocation. [`InMemorySubstrate`] runs mappers and reducers on the Rayon
//! pool, shuffles through a [`DashMap`], and retries failed tasks.
//!
//! Determinism: records inside a group keep the order in which they were
//! emitted (input order, then emission order), groups are reduced in
//! ascending key order, and stage output is concatenated in that order.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
    num::NonZeroUsize,
    sync::Arc,
};

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::error::{ReduceError, SubstrateError};

/// Well-known counter names.
pub mod counter {
    /// Edges accepted into a spanning forest.
    pub const ACCEPTED_EDGES: &str = "accepted_edges";
    /// Edges that survived the matched-vertex filter.
    pub const REMAINING_EDGES: &str = "remaining_edges";
    /// Edges proposed by the sampler.
    pub const PROPOSED_EDGES: &str = "proposed_edges";
    /// Matched pairs accepted by a matching reducer.
    pub const MATCHED_PAIRS: &str = "matched_pairs";
    /// Cluster records written by the propagation reducer.
    pub const CLUSTER_RECORDS: &str = "cluster_records";
}

/// Collects the keyed records produced by one map invocation.
#[derive(Debug)]
pub struct Emitter<K, R> {
    records: Vec<(K, R)>,
}

impl<K, R> Emitter<K, R> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Hands `record` to the substrate under `key`.
    pub fn emit(&mut self, key: K, record: R) {
        self.records.push((key, record));
    }
}

/// Counters incremented by a single task attempt.
///
/// An attempt's counters only reach the stage totals when the attempt
/// succeeds, so retries never double count.
#[derive(Clone, Debug, Default)]
pub struct TaskCounters {
    values: HashMap<&'static str, u64>,
}

impl TaskCounters {
    /// Adds `by` to the counter `name`.
    pub fn increment(&mut self, name: &'static str, by: u64) {
        let slot = self.values.entry(name).or_insert(0);
        *slot = slot.saturating_add(by);
    }

    /// Returns the current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }
}

/// Stage-wide additive counters aggregated from successful tasks.
#[derive(Debug, Default)]
pub struct Counters {
    values: DashMap<&'static str, u64>,
}

impl Counters {
    fn absorb(&self, task: &TaskCounters) {
        for (&name, value) in &task.values {
            let mut slot = self.values.entry(name).or_insert(0);
            *slot = slot.saturating_add(*value);
        }
    }

    /// Returns the aggregated value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).map_or(0, |value| *value)
    }

    /// Returns every counter in name order.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.values
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}

/// Result of one grouping/reduction stage.
#[derive(Debug)]
pub struct StageOutput<O> {
    /// Reducer outputs concatenated in ascending key order.
    pub records: Vec<O>,
    /// Counters aggregated across successful tasks.
    pub counters: Counters,
    /// Number of distinct keys that were reduced.
    pub groups: usize,
}

/// Executes keyed map and reduce phases on behalf of the engine.
pub trait Substrate: Sync {
    /// Maps every input record, groups emitted records by key, and reduces
    /// each group once.
    ///
    /// # Errors
    /// Returns [`SubstrateError`] when a reduction task fails permanently or
    /// keeps failing after every attempt.
    fn map_reduce<I, K, R, O, M, F>(
        &self,
        stage: &'static str,
        input: &[I],
        mapper: M,
        reducer: F,
    ) -> Result<StageOutput<O>, SubstrateError>
    where
        I: Sync,
        K: Clone + Debug + Eq + Hash + Ord + Send + Sync,
        R: Send + Sync,
        O: Send,
        M: Fn(&I, &mut Emitter<K, R>) + Sync,
        F: Fn(&K, &[R], &mut TaskCounters) -> Result<Vec<O>, ReduceError> + Sync;
}

/// Runs stages on the current Rayon pool.
#[derive(Clone, Copy, Debug)]
pub struct InMemorySubstrate {
    attempts: NonZeroUsize,
}

impl Default for InMemorySubstrate {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN.saturating_add(2))
    }
}

impl InMemorySubstrate {
    /// Creates a substrate that tries each task up to `attempts` times.
    #[must_use]
    pub const fn new(attempts: NonZeroUsize) -> Self {
        Self { attempts }
    }

    /// Returns the configured attempt budget per task.
    #[must_use]
    pub const fn attempts(&self) -> NonZeroUsize {
        self.attempts
    }

    fn run_task<K, R, O, F>(
        &self,
        stage: &'static str,
        key: &K,
        records: &[R],
        reducer: &F,
    ) -> Result<(Vec<O>, TaskCounters), SubstrateError>
    where
        K: Debug,
        F: Fn(&K, &[R], &mut TaskCounters) -> Result<Vec<O>, ReduceError>,
    {
        let attempts = self.attempts.get();
        let mut attempt = 1;
        loop {
            let mut counters = TaskCounters::default();
            match reducer(key, records, &mut counters) {
                Ok(output) => return Ok((output, counters)),
                Err(error) if !error.is_retryable() => {
                    return Err(SubstrateError::Fatal {
                        stage,
                        key: Arc::from(format!("{key:?}")),
                        error,
                    });
                }
                Err(error) if attempt >= attempts => {
                    return Err(SubstrateError::RetriesExhausted {
                        stage,
                        key: Arc::from(format!("{key:?}")),
                        attempts,
                        error,
                    });
                }
                Err(error) => {
                    warn!(
                        stage,
                        key = ?key,
                        attempt,
                        code = error.code().as_str(),
                        %error,
                        "reduce task failed; retrying"
                    );
                    attempt += 1;
                }
            }
        }
    }
}

type Sequence = (usize, usize);

impl Substrate for InMemorySubstrate {
    #[instrument(
        name = "substrate.map_reduce",
        level = "debug",
        err,
        skip(self, input, mapper, reducer),
        fields(input = input.len()),
    )]
    fn map_reduce<I, K, R, O, M, F>(
        &self,
        stage: &'static str,
        input: &[I],
        mapper: M,
        reducer: F,
    ) -> Result<StageOutput<O>, SubstrateError>
    where
        I: Sync,
        K: Clone + Debug + Eq + Hash + Ord + Send + Sync,
        R: Send + Sync,
        O: Send,
        M: Fn(&I, &mut Emitter<K, R>) + Sync,
        F: Fn(&K, &[R], &mut TaskCounters) -> Result<Vec<O>, ReduceError> + Sync,
    {
        let shuffle: DashMap<K, Vec<(Sequence, R)>> = DashMap::new();
        input.par_iter().enumerate().for_each(|(index, item)| {
            let mut emitter = Emitter::new();
            mapper(item, &mut emitter);
            for (offset, (key, record)) in emitter.records.into_iter().enumerate() {
                shuffle
                    .entry(key)
                    .or_default()
                    .push(((index, offset), record));
            }
        });

        let mut groups: Vec<(K, Vec<R>)> = shuffle
            .into_iter()
            .map(|(key, mut records)| {
                records.sort_unstable_by_key(|(sequence, _)| *sequence);
                (key, records.into_iter().map(|(_, record)| record).collect())
            })
            .collect();
        groups.par_sort_unstable_by(|left, right| left.0.cmp(&right.0));

        let counters = Counters::default();
        let outputs = groups
            .par_iter()
            .map(|(key, records)| {
                let (output, task_counters) = self.run_task(stage, key, records, &reducer)?;
                counters.absorb(&task_counters);
                Ok(output)
            })
            .collect::<Result<Vec<Vec<O>>, SubstrateError>>()?;

        let group_count = groups.len();
        let records: Vec<O> = outputs.into_iter().flatten().collect();
        debug!(
            stage,
            groups = group_count,
            output = records.len(),
            "stage reduced"
        );
        Ok(StageOutput {
            records,
            counters,
            groups: group_count,
        })
    }
}

/// Read-only per-round broadcast data, such as the matched-vertex set.
///
/// Values are published before the consuming round starts and fetched from
/// inside reducers.
#[derive(Debug)]
pub struct SideChannel<T> {
    name: &'static str,
    values: DashMap<usize, Arc<T>>,
}

impl<T> SideChannel<T> {
    /// Creates an empty channel called `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            values: DashMap::new(),
        }
    }

    /// Returns the channel name.
    #[must_use]
    #[rustfmt::skip]
    pub fn name(&self) -> &'static str { self.name }

    /// Publishes the value for `round`, replacing any earlier value.
    pub fn publish(&self, round: usize, value: T) {
        self.values.insert(round, Arc::new(value));
    }

    /// Fetches the value published for `round`.
    ///
    /// # Errors
    /// Returns [`ReduceError::MissingBroadcast`] when nothing was published.
    pub fn fetch(&self, round: usize) -> Result<Arc<T>, ReduceError> {
        self.values
            .get(&round)
            .map(|value| Arc::clone(value.value()))
            .ok_or(ReduceError::MissingBroadcast {
                round,
                channel: self.name,
            })
    }

    /// Drops the value for `round` once the round has completed.
    pub fn retire(&self, round: usize) {
        self.values.remove(&round);
    }
}

#[cfg(test)]
mod tests;
