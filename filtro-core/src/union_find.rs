//! Disjoint-set forest used by the Kruskal reducer.
//!
//! Reducers program against [`DisjointSet`] so the balancing strategy can
//! change without touching call sites. [`PathCompressedForest`] compresses
//! paths on `find` but always links the left root under the right root, with
//! no rank or size balancing, so tree height is not bounded logarithmically.

use std::{collections::HashMap, hash::Hash};

use crate::error::ReduceError;

/// Disjoint-set operations needed by the spanning-forest reducer.
pub trait DisjointSet<V> {
    /// Returns the representative of `vertex`, or `None` when the vertex was
    /// never registered.
    fn find(&mut self, vertex: &V) -> Option<V>;

    /// Merges the sets containing `left` and `right`.
    ///
    /// Returns `Ok(true)` when two distinct sets were merged and `Ok(false)`
    /// when both vertices already shared a set.
    ///
    /// # Errors
    /// Returns [`ReduceError::InvariantViolation`] when either vertex was never
    /// registered.
    fn union(&mut self, left: &V, right: &V) -> Result<bool, ReduceError>;

    /// Number of disjoint sets currently tracked.
    fn set_count(&self) -> usize;
}

/// Union-find over an explicit vertex set with path compression.
#[derive(Clone, Debug)]
pub struct PathCompressedForest<V> {
    parent: HashMap<V, V>,
    sets: usize,
}

impl<V: Clone + Eq + Hash> PathCompressedForest<V> {
    /// Creates a forest in which every vertex is its own singleton set.
    #[must_use]
    pub fn from_vertices(vertices: impl IntoIterator<Item = V>) -> Self {
        let parent: HashMap<V, V> = vertices
            .into_iter()
            .map(|vertex| (vertex.clone(), vertex))
            .collect();
        let sets = parent.len();
        Self { parent, sets }
    }

    /// Number of registered vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` when no vertex is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

impl<V: Clone + Eq + Hash> DisjointSet<V> for PathCompressedForest<V> {
    fn find(&mut self, vertex: &V) -> Option<V> {
        let mut root = vertex.clone();
        loop {
            let parent = self.parent.get(&root)?;
            if parent == &root {
                break;
            }
            root = parent.clone();
        }

        let mut node = vertex.clone();
        while node != root {
            let Some(parent) = self.parent.insert(node, root.clone()) else {
                break;
            };
            node = parent;
        }

        Some(root)
    }

    fn union(&mut self, left: &V, right: &V) -> Result<bool, ReduceError> {
        let unknown = ReduceError::InvariantViolation {
            invariant: "union-find vertices must be registered before union",
        };
        let left_root = self.find(left).ok_or_else(|| unknown.clone())?;
        let right_root = self.find(right).ok_or(unknown)?;
        if left_root == right_root {
            return Ok(false);
        }
        self.parent.insert(left_root, right_root);
        self.sets = self.sets.saturating_sub(1);
        Ok(true)
    }

    fn set_count(&self) -> usize {
        self.sets
    }
}
