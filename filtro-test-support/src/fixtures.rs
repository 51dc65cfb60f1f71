//! Graph fixtures shared by integration tests.

use std::collections::HashSet;

use filtro_core::{Edge, Vertex, VertexRecord, adjacency_from_edges};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Four-vertex weighted graph whose minimum spanning tree is
/// `{(1,2,1), (3,4,1), (2,3,2)}` with total weight 4.
#[must_use]
pub fn four_vertex_graph() -> Vec<Edge> {
    vec![
        Edge::new(1, 2, 1.0),
        Edge::new(2, 3, 2.0),
        Edge::new(3, 4, 1.0),
        Edge::new(1, 4, 4.0),
        Edge::new(2, 4, 3.0),
    ]
}

/// Unit-weight path `1 - 2 - ... - length`.
#[must_use]
pub fn path_edges(length: i64) -> Vec<Edge> {
    (1..length).map(|v| Edge::unweighted(v, v + 1)).collect()
}

/// Adjacency list of [`path_edges`].
#[must_use]
pub fn path_records(length: i64) -> Vec<VertexRecord> {
    adjacency_from_edges(&path_edges(length))
}

/// Random simple graph on `vertices` vertices with up to `edges` distinct
/// edges and integer weights in `1..=max_weight`.
///
/// The same seed always yields the same graph.
#[must_use]
pub fn random_graph(seed: u64, vertices: i64, edges: usize, max_weight: u32) -> Vec<Edge> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut seen = HashSet::new();
    let mut graph = Vec::with_capacity(edges);
    let attempts = edges.saturating_mul(4);
    for _ in 0..attempts {
        if graph.len() == edges || vertices < 2 {
            break;
        }
        let u = rng.gen_range(0..vertices);
        let v = rng.gen_range(0..vertices);
        if u == v || !seen.insert((u.min(v), u.max(v))) {
            continue;
        }
        let weight = f64::from(rng.gen_range(1..=max_weight.max(1)));
        graph.push(Edge::new(u, v, weight));
    }
    graph
}

/// Returns `true` when no vertex is an endpoint of two pairs.
#[must_use]
pub fn is_valid_matching(pairs: &[Edge]) -> bool {
    let mut seen: HashSet<&Vertex> = HashSet::new();
    pairs.iter().all(|pair| {
        !pair.is_self_loop() && seen.insert(pair.lower()) && seen.insert(pair.higher())
    })
}

/// Returns `true` when every non-loop edge of `graph` touches a matched
/// vertex.
#[must_use]
pub fn is_maximal_matching(pairs: &[Edge], graph: &[Edge]) -> bool {
    let matched: HashSet<&Vertex> = pairs
        .iter()
        .flat_map(|pair| [pair.lower(), pair.higher()])
        .collect();
    graph
        .iter()
        .filter(|edge| !edge.is_self_loop())
        .all(|edge| matched.contains(edge.lower()) || matched.contains(edge.higher()))
}
