//! Vertex, edge and record types shared by every reducer.
//!
//! Edges are stored in canonical undirected form (`lower <= higher`), so
//! both directions of the same edge compare, hash and partition
//! identically.

mod codec;
mod matching;

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use crate::error::ParseError;

pub use self::codec::{
    Loaded, LoadedAdjacency, LoadedEdges, format_cluster_record, format_component,
    format_matched_pair, format_mst_edge, format_weighted_pair, parse_adjacency_line,
    parse_edge_line, read_adjacency, read_edges,
};
pub use self::matching::Matching;

/// Opaque vertex identifier.
///
/// Tokens that parse as `i64` become [`Vertex::Id`] and order numerically;
/// every other token becomes [`Vertex::Name`] and orders lexicographically.
/// Integer vertices sort before named ones.
///
/// # Examples
/// ```
/// use filtro_core::Vertex;
///
/// let a: Vertex = "9".parse().expect("integer token");
/// let b: Vertex = "10".parse().expect("integer token");
/// assert!(a < b);
/// assert_eq!(b.to_string(), "10");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vertex {
    /// Integer identifier.
    Id(i64),
    /// Free-form identifier.
    Name(Arc<str>),
}

impl FromStr for Vertex {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(ParseError::EmptyVertex);
        }
        if token.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(ParseError::InvalidVertex {
                raw: Arc::from(token),
            });
        }
        Ok(token
            .parse::<i64>()
            .map_or_else(|_| Self::Name(Arc::from(token)), Self::Id))
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for Vertex {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<i32> for Vertex {
    fn from(id: i32) -> Self {
        Self::Id(i64::from(id))
    }
}

impl From<&str> for Vertex {
    fn from(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| Self::Name(Arc::from(raw)))
    }
}

/// Orders two endpoints so the smaller one comes first.
///
/// # Examples
/// ```
/// use filtro_core::{Vertex, canonical};
///
/// let forward = canonical(Vertex::Id(3), Vertex::Id(1));
/// let backward = canonical(Vertex::Id(1), Vertex::Id(3));
/// assert_eq!(forward, backward);
/// ```
#[must_use]
pub fn canonical(u: Vertex, v: Vertex) -> (Vertex, Vertex) {
    if u <= v { (u, v) } else { (v, u) }
}

/// Weight assigned to edges read without an explicit weight.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// An undirected weighted edge in canonical form (`lower <= higher`).
///
/// Edges order by weight first, then by `(lower, higher)`, which is the
/// deterministic tie-break used by every weight-sorted reducer.
#[derive(Clone, Debug)]
pub struct Edge {
    lower: Vertex,
    higher: Vertex,
    weight: f64,
}

impl Edge {
    /// Builds a canonical edge between `u` and `v`.
    #[must_use]
    pub fn new(u: impl Into<Vertex>, v: impl Into<Vertex>, weight: f64) -> Self {
        let (lower, higher) = canonical(u.into(), v.into());
        Self {
            lower,
            higher,
            weight,
        }
    }

    /// Builds a canonical edge carrying [`DEFAULT_WEIGHT`].
    #[must_use]
    pub fn unweighted(u: impl Into<Vertex>, v: impl Into<Vertex>) -> Self {
        Self::new(u, v, DEFAULT_WEIGHT)
    }

    /// Returns the smaller endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub fn lower(&self) -> &Vertex { &self.lower }

    /// Returns the larger endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub fn higher(&self) -> &Vertex { &self.higher }

    /// Returns the edge weight.
    #[must_use]
    #[rustfmt::skip]
    pub fn weight(&self) -> f64 { self.weight }

    /// Returns `true` when both endpoints are the same vertex.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.lower == self.higher
    }

    /// Returns `true` when `vertex` is one of the endpoints.
    #[must_use]
    pub fn touches(&self, vertex: &Vertex) -> bool {
        &self.lower == vertex || &self.higher == vertex
    }

    /// Returns the endpoint opposite `vertex`, if `vertex` is an endpoint.
    #[must_use]
    pub fn other(&self, vertex: &Vertex) -> Option<&Vertex> {
        if &self.lower == vertex {
            Some(&self.higher)
        } else if &self.higher == vertex {
            Some(&self.lower)
        } else {
            None
        }
    }

    /// Renders the endpoint pair as `lower,higher`, the string the hash
    /// partitioner keys on.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        format!("{},{}", self.lower, self.higher)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.hash(state);
        self.higher.hash(state);
        self.weight.to_bits().hash(state);
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.lower.cmp(&other.lower))
            .then_with(|| self.higher.cmp(&other.higher))
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One `vertex -> neighbours` record, the unit of cluster propagation.
///
/// The same shape carries the input adjacency list and every round's
/// cluster fragments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexRecord {
    vertex: Vertex,
    neighbours: BTreeSet<Vertex>,
}

impl VertexRecord {
    /// Creates a record for `vertex`.
    #[must_use]
    pub fn new(vertex: Vertex, neighbours: impl IntoIterator<Item = Vertex>) -> Self {
        Self {
            vertex,
            neighbours: neighbours.into_iter().collect(),
        }
    }

    /// Returns the record's key vertex.
    #[must_use]
    #[rustfmt::skip]
    pub fn vertex(&self) -> &Vertex { &self.vertex }

    /// Returns the neighbour (or fragment member) set.
    #[must_use]
    #[rustfmt::skip]
    pub fn neighbours(&self) -> &BTreeSet<Vertex> { &self.neighbours }

    /// Returns `{vertex} ∪ neighbours`.
    #[must_use]
    pub fn closed_set(&self) -> BTreeSet<Vertex> {
        let mut set = self.neighbours.clone();
        set.insert(self.vertex.clone());
        set
    }
}

/// Builds an undirected adjacency list from an edge list.
///
/// Self-loops contribute the vertex with no extra neighbour. Records are
/// returned in ascending vertex order.
#[must_use]
pub fn adjacency_from_edges(edges: &[Edge]) -> Vec<VertexRecord> {
    let mut adjacency = std::collections::BTreeMap::<Vertex, BTreeSet<Vertex>>::new();
    for edge in edges {
        if edge.is_self_loop() {
            adjacency.entry(edge.lower.clone()).or_default();
            continue;
        }
        adjacency
            .entry(edge.lower.clone())
            .or_default()
            .insert(edge.higher.clone());
        adjacency
            .entry(edge.higher.clone())
            .or_default()
            .insert(edge.lower.clone());
    }
    adjacency
        .into_iter()
        .map(|(vertex, neighbours)| VertexRecord { vertex, neighbours })
        .collect()
}
