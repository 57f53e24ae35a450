use std::collections::VecDeque;
use std::sync::atomic::Ordering;

use atomic::Atomic;
use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use frontier::prelude::*;

/// Claims each destination for its first discoverer. Idempotent and
/// commutative, so the reached set is independent of mode and schedule.
struct Reach<'a> {
    seen: &'a [Atomic<u32>],
}

impl<'a> EdgeMapFn<u32> for Reach<'a> {
    fn update(&self, source: u32, destination: u32) -> bool {
        if self.seen[destination as usize].load(Ordering::Relaxed) == u32::MAX {
            self.seen[destination as usize].store(source, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn update_atomic(&self, source: u32, destination: u32) -> bool {
        u32::compare_exchange(
            &self.seen[destination as usize],
            u32::MAX,
            source,
            Ordering::SeqCst,
            Ordering::SeqCst,
        )
        .is_ok()
    }
}

fn unseen(n: usize) -> Vec<Atomic<u32>> {
    (0..n).map(|_| Atomic::new(u32::MAX)).collect()
}

fn random_graph(rng: &mut StdRng, n: usize, density: f64) -> DirectedCsrGraph<u32> {
    let mut edges = Vec::new();
    for s in 0..n as u32 {
        for t in 0..n as u32 {
            if rng.gen_bool(density) {
                edges.push((s, t));
            }
        }
    }
    // Pin the universe size independently of the random draw.
    edges.push((n as u32 - 1, 0));

    GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(edges)
        .build()
}

fn random_frontier(rng: &mut StdRng, n: usize) -> Vec<u32> {
    (0..n as u32).filter(|_| rng.gen_bool(0.2)).collect()
}

fn expand(
    graph: &DirectedCsrGraph<u32>,
    members: &[u32],
    threshold: Option<usize>,
    flags: Flags,
) -> Vec<u32> {
    let n = graph.node_count() as usize;
    let seen = unseen(n);
    let mut frontier = VertexSubset::sparse(n, members.to_vec());
    let mut next = edge_map(graph, &mut frontier, None, &Reach { seen: &seen }, threshold, flags);

    let mut ids = next.to_sparse().to_vec();
    ids.sort_unstable();
    ids
}

#[test]
fn push_and_pull_produce_the_same_frontier() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for n in [10, 50, 200, 1000] {
        for density in [0.01, 0.1, 0.5] {
            let graph = random_graph(&mut rng, n, density);
            let members = random_frontier(&mut rng, n);

            let push = expand(&graph, &members, Some(usize::MAX), Flags::NONE);
            let pull = expand(&graph, &members, Some(0), Flags::NONE);
            let forward = expand(&graph, &members, Some(0), Flags::DENSE_FORWARD);

            assert_eq!(push, pull, "n = {n}, density = {density}");
            assert_eq!(push, forward, "n = {n}, density = {density}");
        }
    }
}

#[test]
fn threshold_boundary_is_transparent() {
    let mut rng = StdRng::seed_from_u64(42);
    let graph = random_graph(&mut rng, 100, 0.05);
    let members = random_frontier(&mut rng, 100);

    let edge_work: usize = members
        .iter()
        .map(|&v| graph.out_degree(v) as usize)
        .sum::<usize>()
        + members.len();

    // Bracket the decision point: one threshold below, one above.
    let below = expand(&graph, &members, Some(edge_work.saturating_sub(1)), Flags::NONE);
    let above = expand(&graph, &members, Some(edge_work + 1), Flags::NONE);

    assert_eq!(below, above);
}

fn reference_reachable(graph: &DirectedCsrGraph<u32>, source: u32) -> usize {
    let n = graph.node_count() as usize;
    let mut visited = bitvec![0; n];
    let mut queue = VecDeque::from([source]);
    visited.set(source as usize, true);

    while let Some(v) = queue.pop_front() {
        for &t in graph.out_neighbors(v) {
            if !visited.replace(t as usize, true) {
                queue.push_back(t);
            }
        }
    }

    visited.count_ones()
}

#[test]
fn frontier_traversal_matches_sequential_reachability() {
    let mut rng = StdRng::seed_from_u64(7);

    for n in [10, 100, 500] {
        for density in [0.01, 0.05, 0.2] {
            let graph = random_graph(&mut rng, n, density);
            let source = rng.gen_range(0..n) as u32;

            let seen = unseen(n);
            seen[source as usize].store(source, Ordering::Relaxed);

            let mut frontier = VertexSubset::single(n, source);
            while !frontier.is_empty() {
                frontier = edge_map(
                    &graph,
                    &mut frontier,
                    None,
                    &Reach { seen: &seen },
                    None,
                    Flags::NONE,
                );
            }

            let reached = seen
                .iter()
                .filter(|s| s.load(Ordering::SeqCst) != u32::MAX)
                .count();

            assert_eq!(
                reached,
                reference_reachable(&graph, source),
                "n = {n}, density = {density}"
            );
        }
    }
}

#[test]
fn subset_conversions_are_lossless() {
    let mut rng = StdRng::seed_from_u64(99);

    for n in [16, 200, 1024] {
        let members = random_frontier(&mut rng, n);

        let mut subset = VertexSubset::sparse(n, members.clone());
        let bits = subset.to_dense().clone();
        let mut back: VertexSubset<u32> = VertexSubset::dense(n, bits);

        let mut expected = members;
        expected.sort_unstable();
        assert_eq!(back.to_sparse(), expected.as_slice());
        assert_eq!(back.len(), subset.len());
    }
}

#[test]
fn vertex_filter_matches_predicate() {
    let mut rng = StdRng::seed_from_u64(123);
    let members = random_frontier(&mut rng, 500);

    let subset = VertexSubset::sparse(500, members.clone());
    let mut kept = vertex_filter(&subset, |v| v % 7 == 0);

    let expected: Vec<u32> = members.iter().copied().filter(|v| v % 7 == 0).collect();
    assert_eq!(kept.to_sparse(), expected.as_slice());
}
