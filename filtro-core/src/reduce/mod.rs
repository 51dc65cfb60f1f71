//! Partition-local reducers.
//!
//! Every reducer is a pure function of one partition's records: it owns its
//! own union-find, matched-vertex set or fragment map, and produces the same
//! output when re-run on the same input. Randomised reducers take their
//! generator explicitly for the same reason.

mod components;
mod hash_to_min;
mod kruskal;
mod matching;
mod sequential;

pub use self::{
    components::{Component, baseline_components, canonicalize_components},
    hash_to_min::{emit_fragments, union_fragments},
    kruskal::{SpanningForest, kruskal},
    matching::{randomized_greedy_matching, weight_ordered_matching},
    sequential::SequentialMatcher,
};
