//! Single-pass greedy matcher for sampled edge streams.

use std::collections::HashSet;

use crate::graph::{Edge, Vertex};

/// Greedy matcher that consumes edges one at a time.
///
/// Only the matched-vertex set and the accepted pairs are retained, so a
/// sample can be streamed through without being materialised.
#[derive(Clone, Debug, Default)]
pub struct SequentialMatcher {
    matched: HashSet<Vertex>,
    pairs: Vec<Edge>,
}

impl SequentialMatcher {
    /// Creates a matcher with no matched vertices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matcher that treats `matched` as already taken.
    #[must_use]
    pub fn with_matched(matched: HashSet<Vertex>) -> Self {
        Self {
            matched,
            pairs: Vec::new(),
        }
    }

    /// Offers one edge; accepts it when neither endpoint is matched.
    pub fn offer(&mut self, edge: &Edge) -> bool {
        if edge.is_self_loop()
            || self.matched.contains(edge.lower())
            || self.matched.contains(edge.higher())
        {
            return false;
        }
        self.matched.insert(edge.lower().clone());
        self.matched.insert(edge.higher().clone());
        self.pairs.push(edge.clone());
        true
    }

    /// Offers every edge in stream order and returns how many were accepted.
    pub fn offer_all<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> usize {
        edges.into_iter().filter(|edge| self.offer(edge)).count()
    }

    /// Returns the pairs accepted so far.
    #[must_use]
    #[rustfmt::skip]
    pub fn pairs(&self) -> &[Edge] { &self.pairs }

    /// Returns every vertex matched so far, including pre-seeded ones.
    #[must_use]
    #[rustfmt::skip]
    pub fn matched(&self) -> &HashSet<Vertex> { &self.matched }

    /// Splits the matcher into its accepted pairs and matched-vertex set.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Edge>, HashSet<Vertex>) {
        (self.pairs, self.matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_first_free_edge_in_stream_order() {
        let edges = vec![
            Edge::unweighted(2, 3),
            Edge::unweighted(1, 2),
            Edge::unweighted(3, 4),
            Edge::unweighted(4, 5),
        ];
        let mut matcher = SequentialMatcher::new();
        assert_eq!(matcher.offer_all(&edges), 2);
        assert_eq!(matcher.pairs(), &[Edge::unweighted(2, 3), Edge::unweighted(4, 5)]);
        assert_eq!(matcher.matched().len(), 4);
    }

    #[test]
    fn pre_matched_vertices_block_edges() {
        let mut matcher = SequentialMatcher::with_matched(HashSet::from([Vertex::Id(2)]));
        assert!(!matcher.offer(&Edge::unweighted(1, 2)));
        assert!(matcher.offer(&Edge::unweighted(1, 3)));
        let (pairs, matched) = matcher.into_parts();
        assert_eq!(pairs, vec![Edge::unweighted(1, 3)]);
        assert!(matched.contains(&Vertex::Id(2)));
    }

    #[test]
    fn rejects_self_loops() {
        let mut matcher = SequentialMatcher::new();
        assert!(!matcher.offer(&Edge::unweighted(7, 7)));
        assert!(matcher.matched().is_empty());
    }
}
