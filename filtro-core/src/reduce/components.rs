//! Final component extraction and the sequential baseline.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::graph::{Vertex, VertexRecord, format_component};

/// One connected component in canonical form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Component {
    representative: Vertex,
    members: Vec<Vertex>,
}

impl Component {
    /// Returns the key chosen to represent the component.
    #[must_use]
    #[rustfmt::skip]
    pub fn representative(&self) -> &Vertex { &self.representative }

    /// Returns the members other than the representative, ascending.
    #[must_use]
    #[rustfmt::skip]
    pub fn members(&self) -> &[Vertex] { &self.members }

    /// Returns every vertex of the component, representative included.
    #[must_use]
    pub fn vertices(&self) -> BTreeSet<Vertex> {
        let mut all: BTreeSet<Vertex> = self.members.iter().cloned().collect();
        all.insert(self.representative.clone());
        all
    }

    /// Number of vertices in the component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len() + 1
    }

    /// Always `false`: a component holds at least its representative.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Renders the component as `representative<TAB>members`.
    #[must_use]
    pub fn to_line(&self) -> String {
        format_component(&self.representative, &self.members)
    }
}

/// Collapses converged cluster records into one line per component.
///
/// Each record contributes the set `{key} ∪ value`. Identical sets collapse
/// to the smallest key that produced them, sets strictly contained in a
/// larger one are dropped, and the survivors are returned ordered by
/// representative.
#[must_use]
pub fn canonicalize_components(records: &[VertexRecord]) -> Vec<Component> {
    let mut representatives: BTreeMap<BTreeSet<Vertex>, Vertex> = BTreeMap::new();
    for record in records {
        let cluster = record.closed_set();
        representatives
            .entry(cluster)
            .and_modify(|rep| {
                if record.vertex() < rep {
                    *rep = record.vertex().clone();
                }
            })
            .or_insert_with(|| record.vertex().clone());
    }

    let mut by_size: Vec<(BTreeSet<Vertex>, Vertex)> = representatives.into_iter().collect();
    by_size.sort_by(|left, right| {
        right
            .0
            .len()
            .cmp(&left.0.len())
            .then_with(|| left.0.cmp(&right.0))
    });

    // Kept clusters indexed by member; subset candidates share the first vertex.
    let mut maximal: Vec<(BTreeSet<Vertex>, Vertex)> = Vec::new();
    let mut containing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (cluster, representative) in by_size {
        let contained = cluster.first().is_some_and(|first| {
            containing
                .get(first)
                .into_iter()
                .flatten()
                .any(|&index| cluster.is_subset(&maximal[index].0))
        });
        if contained {
            continue;
        }
        let index = maximal.len();
        for vertex in &cluster {
            containing.entry(vertex.clone()).or_default().push(index);
        }
        maximal.push((cluster, representative));
    }

    let mut components: Vec<Component> = maximal
        .into_iter()
        .map(|(cluster, representative)| Component {
            members: cluster
                .into_iter()
                .filter(|vertex| vertex != &representative)
                .collect(),
            representative,
        })
        .collect();
    components.sort();
    components
}

/// Sequential depth-first connected components over an adjacency list.
///
/// Neighbours that never appear as a record key still count as vertices.
/// Components are returned ordered by their smallest vertex.
#[must_use]
pub fn baseline_components(records: &[VertexRecord]) -> Vec<BTreeSet<Vertex>> {
    let mut graph: BTreeMap<&Vertex, BTreeSet<&Vertex>> = BTreeMap::new();
    for record in records {
        graph.entry(record.vertex()).or_default();
        for neighbour in record.neighbours() {
            graph.entry(record.vertex()).or_default().insert(neighbour);
            graph.entry(neighbour).or_default().insert(record.vertex());
        }
    }

    let mut visited: HashSet<&Vertex> = HashSet::new();
    let mut components = Vec::new();
    for &start in graph.keys() {
        if !visited.insert(start) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(vertex) = stack.pop() {
            component.insert(vertex.clone());
            for &next in graph.get(vertex).into_iter().flatten() {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn record(vertex: i64, neighbours: &[i64]) -> VertexRecord {
        VertexRecord::new(Vertex::Id(vertex), neighbours.iter().copied().map(Vertex::Id))
    }

    fn ids(values: &[i64]) -> Vec<Vertex> {
        values.iter().copied().map(Vertex::Id).collect()
    }

    #[test]
    fn converged_records_collapse_to_one_line_per_component() {
        let records = vec![
            record(1, &[1, 2, 3]),
            record(2, &[1]),
            record(3, &[1]),
            record(7, &[7, 8]),
            record(8, &[7]),
        ];
        let components = canonicalize_components(&records);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].representative(), &Vertex::Id(1));
        assert_eq!(components[0].members(), ids(&[2, 3]).as_slice());
        assert_eq!(components[1].to_line(), "7\t8");
    }

    #[test]
    fn duplicate_clusters_keep_the_smallest_key() {
        let records = vec![record(5, &[4, 6]), record(4, &[5, 6]), record(6, &[4, 5])];
        let components = canonicalize_components(&records);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].representative(), &Vertex::Id(4));
        assert_eq!(components[0].to_line(), "4\t5,6");
    }

    #[test]
    fn many_small_components_are_all_kept() {
        let pairs = 20_000_i64;
        let records: Vec<VertexRecord> = (0..pairs)
            .flat_map(|pair| {
                let low = pair * 2;
                [record(low, &[low, low + 1]), record(low + 1, &[low])]
            })
            .collect();
        let components = canonicalize_components(&records);
        assert_eq!(components.len(), 20_000);
        assert!(components.iter().all(|component| component.len() == 2));
        assert_eq!(components[0].to_line(), "0\t1");
        assert_eq!(components[19_999].to_line(), "39998\t39999");
    }

    #[test]
    fn overlapping_clusters_only_drop_true_subsets() {
        let records = vec![record(1, &[2, 3]), record(3, &[4]), record(2, &[1])];
        let lines: Vec<String> = canonicalize_components(&records)
            .iter()
            .map(Component::to_line)
            .collect();
        assert_eq!(lines, ["1\t2,3", "3\t4"]);
    }

    #[test]
    fn isolated_vertex_has_no_members() {
        let components = canonicalize_components(&[record(3, &[])]);
        assert_eq!(components[0].len(), 1);
        assert_eq!(components[0].to_line(), "3\t");
    }

    #[rstest]
    #[case::path(vec![record(1, &[2]), record(2, &[1, 3]), record(3, &[2])], vec![vec![1, 2, 3]])]
    #[case::two_parts(vec![record(1, &[2]), record(3, &[4])], vec![vec![1, 2], vec![3, 4]])]
    #[case::isolated(vec![record(1, &[]), record(2, &[])], vec![vec![1], vec![2]])]
    fn baseline_finds_components(
        #[case] records: Vec<VertexRecord>,
        #[case] expected: Vec<Vec<i64>>,
    ) {
        let expected: Vec<BTreeSet<Vertex>> = expected
            .iter()
            .map(|component| ids(component).into_iter().collect())
            .collect();
        assert_eq!(baseline_components(&records), expected);
    }
}
