//! Matching container that enforces the one-partner-per-vertex invariant.

use std::collections::HashMap;

use super::{Edge, Vertex};

/// A set of vertex-disjoint edges.
///
/// The partner map is symmetric and injective by construction: an edge is
/// only accepted when neither endpoint already has a partner. Accepted edges
/// are kept in acceptance order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matching {
    partner: HashMap<Vertex, Vertex>,
    edges: Vec<Edge>,
}

impl Matching {
    /// Creates an empty matching.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `edge` when both endpoints are unmatched.
    ///
    /// Self-loops are never accepted. Returns `true` when the edge joined
    /// the matching.
    pub fn accept(&mut self, edge: &Edge) -> bool {
        if edge.is_self_loop() || self.is_matched(edge.lower()) || self.is_matched(edge.higher())
        {
            return false;
        }
        self.partner
            .insert(edge.lower().clone(), edge.higher().clone());
        self.partner
            .insert(edge.higher().clone(), edge.lower().clone());
        self.edges.push(edge.clone());
        true
    }

    /// Returns `true` when `vertex` has a partner.
    #[must_use]
    pub fn is_matched(&self, vertex: &Vertex) -> bool {
        self.partner.contains_key(vertex)
    }

    /// Returns the partner of `vertex`.
    #[must_use]
    pub fn partner(&self, vertex: &Vertex) -> Option<&Vertex> {
        self.partner.get(vertex)
    }

    /// Returns the accepted edges in acceptance order.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[Edge] { &self.edges }

    /// Consumes the matching and returns its edges.
    #[must_use]
    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Number of matched pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` when no pair has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of the accepted edge weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(Edge::weight).sum()
    }
}
