//! Greedy matching reducers.

use std::collections::BTreeMap;

use rand::{Rng, seq::SliceRandom};

use crate::graph::{Edge, Matching, Vertex};

/// Randomised greedy maximal matching over one partition.
///
/// Vertices are visited in a random order drawn from `rng`; each unmatched
/// vertex takes the first still-unmatched neighbour among its incident edges
/// in partition order. The result is maximal with respect to `edges`: every
/// non-loop edge has at least one matched endpoint.
///
/// # Examples
/// ```
/// use filtro_core::{Edge, randomized_greedy_matching, task_rng};
///
/// let edges = vec![Edge::unweighted(1, 2), Edge::unweighted(2, 3), Edge::unweighted(3, 4)];
/// let matching = randomized_greedy_matching(&edges, &mut task_rng(7, 1, 0));
/// assert!(!matching.is_empty());
/// ```
pub fn randomized_greedy_matching<R: Rng + ?Sized>(edges: &[Edge], rng: &mut R) -> Matching {
    let mut incident: BTreeMap<&Vertex, Vec<&Edge>> = BTreeMap::new();
    for edge in edges.iter().filter(|edge| !edge.is_self_loop()) {
        incident.entry(edge.lower()).or_default().push(edge);
        incident.entry(edge.higher()).or_default().push(edge);
    }

    let mut order: Vec<&Vertex> = incident.keys().copied().collect();
    order.shuffle(rng);

    let mut matching = Matching::new();
    for vertex in order {
        if matching.is_matched(vertex) {
            continue;
        }
        let Some(candidates) = incident.get(vertex) else {
            continue;
        };
        for edge in candidates {
            if matching.accept(edge) {
                break;
            }
        }
    }
    matching
}

/// Weight-ordered greedy matching over one partition.
///
/// Edges are scanned in ascending weight order, ties broken by the canonical
/// endpoint pair, and accepted when both endpoints are free.
///
/// # Examples
/// ```
/// use filtro_core::{Edge, weight_ordered_matching};
///
/// let edges = vec![Edge::new(1, 2, 5.0), Edge::new(2, 3, 1.0), Edge::new(3, 4, 2.0)];
/// let matching = weight_ordered_matching(&edges);
/// assert_eq!(matching.edges(), &[Edge::new(2, 3, 1.0)]);
/// ```
#[must_use]
pub fn weight_ordered_matching(edges: &[Edge]) -> Matching {
    let mut sorted: Vec<&Edge> = edges.iter().collect();
    sorted.sort_unstable();
    let mut matching = Matching::new();
    for edge in sorted {
        matching.accept(edge);
    }
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    use filtro_test_support::pbt::ProptestRunProfile;
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::sampling::task_rng;

    fn assert_valid(matching: &Matching) {
        let mut seen = std::collections::HashSet::new();
        for edge in matching.edges() {
            assert!(!edge.is_self_loop());
            assert!(seen.insert(edge.lower().clone()), "{} matched twice", edge.lower());
            assert!(seen.insert(edge.higher().clone()), "{} matched twice", edge.higher());
        }
    }

    fn assert_maximal(matching: &Matching, edges: &[Edge]) {
        for edge in edges.iter().filter(|edge| !edge.is_self_loop()) {
            assert!(
                matching.is_matched(edge.lower()) || matching.is_matched(edge.higher()),
                "edge {} could still be added",
                edge.canonical_key()
            );
        }
    }

    #[test]
    fn same_seed_gives_same_matching() {
        let edges: Vec<Edge> = (0..40).map(|i| Edge::unweighted(i, (i * 7 + 3) % 40)).collect();
        let first = randomized_greedy_matching(&edges, &mut task_rng(11, 2, 3));
        let second = randomized_greedy_matching(&edges, &mut task_rng(11, 2, 3));
        assert_eq!(first.edges(), second.edges());
        assert_valid(&first);
        assert_maximal(&first, &edges);
    }

    #[rstest]
    #[case::path(
        vec![Edge::new(1, 2, 3.0), Edge::new(2, 3, 1.0), Edge::new(3, 4, 2.0)],
        vec![Edge::new(2, 3, 1.0)],
    )]
    #[case::ties_prefer_smaller_endpoints(
        vec![Edge::new(2, 3, 1.0), Edge::new(1, 2, 1.0), Edge::new(3, 4, 1.0)],
        vec![Edge::new(1, 2, 1.0), Edge::new(3, 4, 1.0)],
    )]
    #[case::self_loops_ignored(
        vec![Edge::new(1, 1, 0.5), Edge::new(1, 2, 1.0)],
        vec![Edge::new(1, 2, 1.0)],
    )]
    fn weight_ordered_scans_ascending(#[case] edges: Vec<Edge>, #[case] expected: Vec<Edge>) {
        assert_eq!(weight_ordered_matching(&edges).edges(), expected.as_slice());
    }

    fn edge_list() -> impl Strategy<Value = Vec<Edge>> {
        prop::collection::vec((0i64..15, 0i64..15, 1u8..10), 0..50).prop_map(|raw| {
            raw.into_iter()
                .map(|(u, v, w)| Edge::new(u, v, f64::from(w)))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(ProptestRunProfile::load(64).cases()))]

        #[test]
        fn randomized_matching_is_valid_and_maximal(edges in edge_list(), seed in any::<u64>()) {
            let matching = randomized_greedy_matching(&edges, &mut task_rng(seed, 1, 0));
            assert_valid(&matching);
            assert_maximal(&matching, &edges);
        }

        #[test]
        fn weight_ordered_matching_is_valid_and_maximal(edges in edge_list()) {
            let matching = weight_ordered_matching(&edges);
            assert_valid(&matching);
            assert_maximal(&matching, &edges);
        }
    }
}
