//! Kruskal minimum spanning forest over one partition's edges.
//!
//! Edges are sorted ascending by weight with ties broken by the canonical
//! `(lower, higher)` pair, so the accepted forest is identical on every run.
//! Merging the forests of edge-disjoint partitions and re-running Kruskal on
//! the union yields the minimum spanning forest of the whole graph; the
//! threshold policy relies on this.

use std::collections::BTreeSet;

use crate::{
    error::ReduceError,
    graph::Edge,
    union_find::{DisjointSet, PathCompressedForest},
};

/// Spanning forest accepted by one Kruskal pass.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanningForest {
    edges: Vec<Edge>,
    vertex_count: usize,
    component_count: usize,
}

impl SpanningForest {
    /// Returns the accepted edges in acceptance (ascending weight) order.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[Edge] { &self.edges }

    /// Consumes the forest and returns its edges.
    #[must_use]
    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Number of accepted edges, the threshold policy's counter.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct vertices seen by the pass.
    #[must_use]
    #[rustfmt::skip]
    pub fn vertex_count(&self) -> usize { self.vertex_count }

    /// Number of trees in the forest, counting isolated self-loop vertices.
    #[must_use]
    #[rustfmt::skip]
    pub fn component_count(&self) -> usize { self.component_count }

    /// Sum of the accepted edge weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(Edge::weight).sum()
    }
}

/// Computes a minimum spanning forest of `edges`.
///
/// The union-find covers exactly the vertices that appear in `edges`.
/// Self-loops never join the forest.
///
/// # Errors
/// Returns [`ReduceError::InvariantViolation`] if the union-find rejects a
/// vertex it was built from, which indicates a logic error.
///
/// # Examples
/// ```
/// use filtro_core::{Edge, kruskal};
///
/// let edges = vec![Edge::new(1, 2, 1.0), Edge::new(2, 3, 2.0), Edge::new(1, 3, 5.0)];
/// let forest = kruskal(&edges).expect("reduction succeeds");
/// assert_eq!(forest.accepted(), 2);
/// assert_eq!(forest.total_weight(), 3.0);
/// ```
pub fn kruskal(edges: &[Edge]) -> Result<SpanningForest, ReduceError> {
    let mut sorted = edges.to_vec();
    sorted.sort_unstable();

    let vertices: BTreeSet<_> = sorted
        .iter()
        .flat_map(|edge| [edge.lower().clone(), edge.higher().clone()])
        .collect();
    let vertex_count = vertices.len();
    let mut forest = PathCompressedForest::from_vertices(vertices);

    let mut accepted = Vec::with_capacity(vertex_count.saturating_sub(1));
    for edge in sorted {
        if edge.is_self_loop() {
            continue;
        }
        if forest.union(edge.lower(), edge.higher())? {
            accepted.push(edge);
        }
        if accepted.len() == vertex_count.saturating_sub(1) {
            break;
        }
    }

    Ok(SpanningForest {
        edges: accepted,
        vertex_count,
        component_count: forest.set_count(),
    })
}
