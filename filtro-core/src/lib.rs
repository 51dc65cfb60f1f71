//! Filtro core library.
//!
//! Round-based graph reduction: minimum spanning forests by filtering,
//! hash-to-min connected components, and sampling-based maximal matching,
//! driven by an [`Engine`] over a key-grouping [`Substrate`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod controller;
mod error;
mod graph;
mod partition;
mod reduce;
mod sampling;
mod substrate;
mod summary;
mod union_find;

pub use crate::{
    controller::{
        DEFAULT_SEED, Engine, EngineBuilder, MATCHED_VERTICES_CHANNEL, Policy, RoundState,
    },
    error::{
        EngineError, EngineErrorCode, ParseError, ParseErrorCode, ReduceError, ReduceErrorCode,
        Result, SubstrateError, SubstrateErrorCode,
    },
    graph::{
        DEFAULT_WEIGHT, Edge, Loaded, LoadedAdjacency, LoadedEdges, Matching, Vertex,
        VertexRecord, adjacency_from_edges, canonical, format_cluster_record, format_component,
        format_matched_pair, format_mst_edge, format_weighted_pair, parse_adjacency_line,
        parse_edge_line, read_adjacency, read_edges,
    },
    partition::{Partitioner, hash_bucket, weight_bucket},
    reduce::{
        Component, SequentialMatcher, SpanningForest, baseline_components,
        canonicalize_components, emit_fragments, kruskal, randomized_greedy_matching,
        union_fragments, weight_ordered_matching,
    },
    sampling::{Proposal, Sampler, sampling_probability, task_rng, task_seed},
    substrate::{
        Counters, Emitter, InMemorySubstrate, SideChannel, StageOutput, Substrate, TaskCounters,
        counter,
    },
    summary::{ComponentsRun, MatchingRun, MstRun, RoundReport, RunSummary},
    union_find::{DisjointSet, PathCompressedForest},
};
