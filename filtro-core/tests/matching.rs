//! Tests for the matching runs.

use std::collections::HashSet;

use filtro_core::{
    Edge, EngineBuilder, EngineError, MATCHED_VERTICES_CHANNEL, Policy, SideChannel, Vertex,
    sampling_probability,
};
use filtro_test_support::fixtures::{
    is_maximal_matching, is_valid_matching, path_edges, random_graph,
};
use rstest::{fixture, rstest};

#[fixture]
fn dense_graph() -> Vec<Edge> {
    random_graph(7, 200, 1000, 1)
}

fn disjoint_pairs(count: i64) -> Vec<Edge> {
    (0..count).map(|i| Edge::unweighted(2 * i, 2 * i + 1)).collect()
}

#[rstest]
fn probability_follows_the_memory_budget() {
    assert!((sampling_probability(100, 1000) - 0.01).abs() < 1e-12);
}

#[rstest]
fn sampling_rounds_shrink_the_graph_until_it_fits(dense_graph: Vec<Edge>) {
    let engine = EngineBuilder::new()
        .with_memory_threshold(100)
        .with_max_rounds(1000)
        .build()
        .expect("configuration must be valid");
    let run = engine
        .maximal_matching(&dense_graph)
        .expect("run must succeed");

    assert_eq!(run.summary.policy(), Policy::SamplingThreshold);
    assert!(run.summary.rounds() > 1);
    assert!(is_valid_matching(&run.pairs));
    assert!(is_maximal_matching(&run.pairs, &dense_graph));

    let surviving: Vec<usize> = run
        .summary
        .reports()
        .iter()
        .filter(|report| report.stage() == "matching.filter")
        .map(|report| report.output_records())
        .collect();
    let mut previous = dense_graph.len();
    for count in &surviving {
        assert!(*count < previous, "round did not remove an edge");
        previous = *count;
    }
    assert!(previous <= 100);
}

#[rstest]
fn generous_budget_finishes_in_one_round(dense_graph: Vec<Edge>) {
    let engine = EngineBuilder::new().build().expect("configuration must be valid");
    let run = engine
        .maximal_matching(&dense_graph)
        .expect("run must succeed");
    assert_eq!(run.summary.rounds(), 1);
    assert!(is_maximal_matching(&run.pairs, &dense_graph));
}

#[rstest]
fn self_loops_never_match() {
    let engine = EngineBuilder::new().build().expect("configuration must be valid");
    let edges = vec![Edge::unweighted(1, 1), Edge::unweighted(1, 2)];
    let run = engine.maximal_matching(&edges).expect("run must succeed");
    assert_eq!(run.pairs, vec![Edge::unweighted(1, 2)]);
}

#[rstest]
fn round_cap_stops_slow_sampling() {
    let engine = EngineBuilder::new()
        .with_memory_threshold(1)
        .with_max_rounds(1)
        .build()
        .expect("configuration must be valid");
    let err = engine
        .maximal_matching(&disjoint_pairs(50))
        .expect_err("one sparse round cannot clear fifty pairs");
    assert_eq!(
        err,
        EngineError::NonConvergence {
            policy: Policy::SamplingThreshold,
            rounds: 1,
        }
    );
}

#[rstest]
fn filter_requires_the_matched_vertex_broadcast() {
    let engine = EngineBuilder::new().build().expect("configuration must be valid");
    let channel = SideChannel::new(MATCHED_VERTICES_CHANNEL);

    let err = engine
        .filter_round(&channel, 3, &path_edges(4))
        .expect_err("nothing was published for round 3");
    assert_eq!(
        err,
        EngineError::MissingBroadcast {
            round: 3,
            channel: MATCHED_VERTICES_CHANNEL,
        }
    );

    channel.publish(3, HashSet::from([Vertex::Id(2)]));
    let (survivors, count) = engine
        .filter_round(&channel, 3, &path_edges(4))
        .expect("broadcast is available");
    assert_eq!(survivors, vec![Edge::unweighted(3, 4)]);
    assert_eq!(count, 1);
}

#[rstest]
fn weighted_matching_skips_non_positive_weights() {
    let engine = EngineBuilder::new().build().expect("configuration must be valid");
    let edges = vec![
        Edge::new(1, 2, 0.0),
        Edge::new(2, 3, -1.0),
        Edge::new(3, 4, 2.0),
        Edge::new(4, 5, 3.0),
    ];
    let run = engine.weighted_matching(&edges).expect("run must succeed");
    assert_eq!(run.pairs, vec![Edge::new(3, 4, 2.0)]);
    assert_eq!(run.summary.malformed(), 2);
    assert_eq!(run.summary.policy(), Policy::SinglePass);
}

#[rstest]
fn weighted_merge_resolves_conflicts_across_buckets() {
    let engine = EngineBuilder::new().build().expect("configuration must be valid");
    // Weights 1, 5 and 9 fall into buckets 1, 3 and 4.
    let edges = vec![Edge::new(2, 3, 5.0), Edge::new(1, 2, 1.0), Edge::new(3, 4, 9.0)];
    let run = engine.weighted_matching(&edges).expect("run must succeed");
    assert_eq!(run.pairs, vec![Edge::new(1, 2, 1.0), Edge::new(3, 4, 9.0)]);
    assert!(is_valid_matching(&run.pairs));
}

#[rstest]
#[case(1)]
#[case(99)]
fn greedy_matching_is_reproducible_per_seed(dense_graph: Vec<Edge>, #[case] seed: u64) {
    let engine = EngineBuilder::new()
        .with_seed(seed)
        .build()
        .expect("configuration must be valid");
    let first = engine.greedy_matching(&dense_graph).expect("run must succeed");
    let second = engine.greedy_matching(&dense_graph).expect("run must succeed");
    assert_eq!(first.pairs, second.pairs);
    assert!(is_valid_matching(&first.pairs));
    assert!(is_maximal_matching(&first.pairs, &dense_graph));
}
