//! Hash-to-min cluster propagation.
//!
//! Each record `v -> N(v)` sends its closed set `C = {v} ∪ N(v)` to the
//! smallest member `m`, and tells every other member about `m`. Keys grow
//! their sets monotonically round over round until every cluster is owned by
//! its minimum vertex.

use std::collections::BTreeSet;

use crate::graph::{Vertex, VertexRecord};

/// Map side of one hash-to-min round.
///
/// Returns `(min(C), C)` followed by `(u, {min(C)})` for every other member
/// `u`, in ascending member order.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
///
/// use filtro_core::{Vertex, VertexRecord, emit_fragments};
///
/// let record = VertexRecord::new(Vertex::Id(2), [Vertex::Id(1), Vertex::Id(3)]);
/// let fragments = emit_fragments(&record);
/// assert_eq!(fragments[0].0, Vertex::Id(1));
/// assert_eq!(fragments.len(), 3);
/// ```
#[must_use]
pub fn emit_fragments(record: &VertexRecord) -> Vec<(Vertex, BTreeSet<Vertex>)> {
    let closed = record.closed_set();
    let Some(min) = closed.first().cloned() else {
        return Vec::new();
    };
    let mut fragments = Vec::with_capacity(closed.len());
    for member in closed.iter().skip(1) {
        fragments.push((member.clone(), BTreeSet::from([min.clone()])));
    }
    fragments.insert(0, (min, closed));
    fragments
}

/// Reduce side of one hash-to-min round: unions every fragment addressed
/// to `vertex`.
#[must_use]
pub fn union_fragments(vertex: &Vertex, fragments: &[BTreeSet<Vertex>]) -> VertexRecord {
    let members: BTreeSet<Vertex> = fragments.iter().flatten().cloned().collect();
    VertexRecord::new(vertex.clone(), members)
}
