//! The direction-optimizing traversal operator.
//!
//! `edge_map` applies a user update along every edge leaving the current
//! frontier and assembles the next frontier from the successful updates.
//! Depending on how much edge work the frontier represents, the engine
//! either pushes along the frontier's out-edges (sparse) or pulls over all
//! vertices' in-edges (dense).

use std::ops::BitOr;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::index::Idx;
use crate::par::{pack, parallel_for, split_by_counts};
use crate::subset::{Bitmap, VertexSubset};
use crate::{DirectedDegrees, DirectedNeighbors, Graph};

/// The per-edge update a traversal applies.
///
/// The engine picks which of the two update methods to call based on the
/// write-exclusivity it can guarantee for the destination vertex:
///
/// * [`update_atomic`](EdgeMapFn::update_atomic) runs where several tasks
///   may touch the same destination concurrently (push mode, pull mode
///   without destination ownership). Implementations must synchronize,
///   typically with a compare-and-swap on the per-vertex state.
/// * [`update`](EdgeMapFn::update) runs where the engine guarantees a
///   single writer per destination (pull mode, dense-forward mode) and may
///   use plain reads and writes.
///
/// Returning true requests the destination for the next frontier. When the
/// caller supplies a next bitmap, marking that bitmap has the same effect;
/// see [`edge_map`].
pub trait EdgeMapFn<NI: Idx> {
    /// Pre-filter on the destination; edges to vertices failing the
    /// condition are skipped. The pull executor re-checks the condition
    /// while scanning a destination's in-edges, so a condition that flips
    /// to false mid-scan short-circuits the remaining work.
    #[inline]
    fn cond(&self, _destination: NI) -> bool {
        true
    }

    fn update(&self, source: NI, destination: NI) -> bool;

    fn update_atomic(&self, source: NI, destination: NI) -> bool;
}

/// Option bits for [`edge_map`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Apply updates but build no output frontier.
    pub const NO_OUTPUT: Flags = Flags(1);
    /// In dense mode, iterate frontier out-edges with destination-range
    /// ownership instead of pulling over in-edges.
    pub const DENSE_FORWARD: Flags = Flags(1 << 1);
    /// Deduplicate the sparse output array.
    pub const REMOVE_DUPLICATES: Flags = Flags(1 << 2);

    #[inline]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Applies `func` along the out-edges of `frontier` and returns the next
/// frontier.
///
/// The traversal direction is chosen by comparing the frontier's edge work
/// `E_out(F) + |F|` against `threshold`; `None` means the default `m / 20`.
///
/// When `next` is supplied, the returned subset wraps that bitmap and the
/// bitmap contents are authoritative: the engine marks it for updates that
/// return true, and the update function may mark it directly (some updates
/// claim a destination without requesting it through their return value).
/// With [`Flags::NO_OUTPUT`] no output is assembled and the returned subset
/// is empty.
pub fn edge_map<NI, G, F>(
    graph: &G,
    frontier: &mut VertexSubset<NI>,
    next: Option<Bitmap>,
    func: &F,
    threshold: Option<usize>,
    flags: Flags,
) -> VertexSubset<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
    F: EdgeMapFn<NI> + Sync,
{
    let node_count = graph.node_count().index();

    if frontier.is_empty() {
        return VertexSubset::empty(node_count);
    }

    let threshold = threshold.unwrap_or(graph.edge_count().index() / 20);
    let out_edges = frontier_out_edges(graph, frontier);

    if out_edges + frontier.len() > threshold {
        debug!(
            "edge_map: |F| = {}, E_out(F) = {}, threshold = {} -> dense",
            frontier.len(),
            out_edges,
            threshold
        );
        if flags.contains(Flags::DENSE_FORWARD) {
            edge_map_dense_forward(graph, frontier, next, func, flags)
        } else {
            edge_map_dense(graph, frontier, next, func, flags)
        }
    } else {
        debug!(
            "edge_map: |F| = {}, E_out(F) = {}, threshold = {} -> sparse",
            frontier.len(),
            out_edges,
            threshold
        );
        edge_map_sparse(graph, frontier, next, func, flags)
    }
}

fn frontier_out_edges<NI, G>(graph: &G, frontier: &VertexSubset<NI>) -> usize
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + Sync,
{
    if let Some(ids) = frontier.sparse_ids() {
        ids.par_iter()
            .map(|&v| graph.out_degree(v).index())
            .sum()
    } else if let Some(bits) = frontier.dense_bits() {
        (0..graph.node_count().index())
            .into_par_iter()
            .filter(|&v| bits.get(v))
            .map(|v| graph.out_degree(NI::new(v)).index())
            .sum()
    } else {
        0
    }
}

/// Push execution: parallel over the frontier's out-edges, atomic updates.
fn edge_map_sparse<NI, G, F>(
    graph: &G,
    frontier: &mut VertexSubset<NI>,
    next: Option<Bitmap>,
    func: &F,
    flags: Flags,
) -> VertexSubset<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
    F: EdgeMapFn<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let no_output = flags.contains(Flags::NO_OUTPUT);
    let ids = frontier.to_sparse();

    if no_output || next.is_some() {
        ids.par_iter().for_each(|&source| {
            for &destination in graph.out_neighbors(source) {
                if func.cond(destination) && func.update_atomic(source, destination) {
                    if let Some(bits) = &next {
                        bits.set(destination.index());
                    }
                }
            }
        });

        return match next {
            Some(bits) if !no_output => VertexSubset::dense(node_count, bits),
            _ => VertexSubset::empty(node_count),
        };
    }

    // Per-source scratch slots, one per out-edge, so that every task writes
    // its own range; surviving destinations are packed afterwards.
    let degrees = ids
        .par_iter()
        .map(|&source| graph.out_degree(source).index())
        .collect::<Vec<_>>();
    let total: usize = degrees.par_iter().sum();

    let mut scratch = vec![NI::max_value(); total];
    let slots = split_by_counts(&mut scratch, &degrees);

    slots
        .into_par_iter()
        .zip(ids.par_iter())
        .for_each(|(slot, &source)| {
            for (entry, &destination) in slot.iter_mut().zip(graph.out_neighbors(source)) {
                if func.cond(destination) && func.update_atomic(source, destination) {
                    *entry = destination;
                }
            }
        });

    if flags.contains(Flags::REMOVE_DUPLICATES) {
        remove_duplicates(node_count, &mut scratch);
    }

    VertexSubset::sparse(node_count, pack(&scratch, |&d| d != NI::max_value()))
}

/// Keeps each destination at most once: every slot position tries to claim
/// its destination through a CAS stamp; losers blank their own slot.
fn remove_duplicates<NI: Idx>(node_count: usize, scratch: &mut [NI]) {
    let stamps = (0..node_count)
        .map(|_| AtomicUsize::new(usize::MAX))
        .collect::<Vec<_>>();

    scratch.par_iter_mut().enumerate().for_each(|(position, slot)| {
        let destination = *slot;
        if destination != NI::max_value()
            && stamps[destination.index()]
                .compare_exchange(usize::MAX, position, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
        {
            *slot = NI::max_value();
        }
    });
}

/// Pull execution: parallel over all destinations, scanning in-edges
/// against the dense frontier. Each destination is processed by exactly one
/// task, so the non-atomic update applies.
fn edge_map_dense<NI, G, F>(
    graph: &G,
    frontier: &mut VertexSubset<NI>,
    next: Option<Bitmap>,
    func: &F,
    flags: Flags,
) -> VertexSubset<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
    F: EdgeMapFn<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let bits = frontier.to_dense().clone();
    let (out, wrap_dense) = next_bits(node_count, next, flags);

    parallel_for(node_count, |d| {
        let destination = NI::new(d);
        if !func.cond(destination) {
            return;
        }
        for &source in graph.in_neighbors(destination) {
            if bits.get(source.index()) && func.update(source, destination) {
                if let Some(out) = &out {
                    out.set(d);
                }
            }
            if !func.cond(destination) {
                break;
            }
        }
    });

    assemble(node_count, out, wrap_dense)
}

/// Dense-forward execution: frontier out-edges like push mode, but the
/// destination ids are partitioned into ranges with a single owning task
/// each, which makes the non-atomic update safe.
fn edge_map_dense_forward<NI, G, F>(
    graph: &G,
    frontier: &mut VertexSubset<NI>,
    next: Option<Bitmap>,
    func: &F,
    flags: Flags,
) -> VertexSubset<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
    F: EdgeMapFn<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let bits = frontier.to_dense().clone();
    let (out, wrap_dense) = next_bits(node_count, next, flags);

    destination_ranges(node_count).into_par_iter().for_each(|range| {
        for s in 0..node_count {
            if !bits.get(s) {
                continue;
            }
            let source = NI::new(s);
            let targets = graph.out_neighbors(source);
            // Out-lists are sorted, so the slice that falls into this
            // task's destination range is contiguous.
            let from = targets.partition_point(|&d| d.index() < range.start);
            for &destination in &targets[from..] {
                if destination.index() >= range.end {
                    break;
                }
                if func.cond(destination) && func.update(source, destination) {
                    if let Some(out) = &out {
                        out.set(destination.index());
                    }
                }
            }
        }
    });

    assemble(node_count, out, wrap_dense)
}

fn destination_ranges(node_count: usize) -> Vec<Range<usize>> {
    let task_count = num_cpus::get().max(1) * 4;
    let chunk = (node_count + task_count - 1) / task_count;
    let chunk = chunk.max(1);

    (0..node_count)
        .step_by(chunk)
        .map(|start| start..usize::min(start + chunk, node_count))
        .collect()
}

fn next_bits(node_count: usize, next: Option<Bitmap>, flags: Flags) -> (Option<Bitmap>, bool) {
    match (flags.contains(Flags::NO_OUTPUT), next) {
        (true, _) => (None, false),
        (false, Some(bits)) => (Some(bits), true),
        (false, None) => (Some(Bitmap::new(node_count)), false),
    }
}

fn assemble<NI: Idx>(node_count: usize, out: Option<Bitmap>, wrap_dense: bool) -> VertexSubset<NI> {
    match out {
        None => VertexSubset::empty(node_count),
        Some(bits) if wrap_dense => VertexSubset::dense(node_count, bits),
        Some(bits) => {
            let ids = bits.ones::<NI>();
            VertexSubset::sparse(node_count, ids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::DirectedCsrGraph;
    use atomic::Atomic;

    /// Marks every reached destination once; idempotent and commutative.
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

    fn seen_cells(n: usize) -> Vec<Atomic<u32>> {
        (0..n).map(|_| Atomic::new(u32::MAX)).collect()
    }

    fn test_graph() -> DirectedCsrGraph<u32> {
        GraphBuilder::new()
            .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 1)])
            .build()
    }

    struct Panics;

    impl EdgeMapFn<u32> for Panics {
        fn update(&self, _: u32, _: u32) -> bool {
            panic!("update on empty frontier")
        }

        fn update_atomic(&self, _: u32, _: u32) -> bool {
            panic!("update_atomic on empty frontier")
        }
    }

    #[test]
    fn empty_frontier_short_circuits() {
        let graph = test_graph();
        let mut frontier = VertexSubset::empty(graph.node_count() as usize);

        let next = edge_map(&graph, &mut frontier, None, &Panics, None, Flags::NONE);
        assert!(next.is_empty());
    }

    #[test]
    fn sparse_and_dense_agree() {
        let graph = test_graph();
        let n = graph.node_count() as usize;

        // A threshold beyond m forces push mode, zero forces pull mode.
        let seen = seen_cells(n);
        let mut frontier = VertexSubset::single(n, 0_u32);
        let mut sparse = edge_map(
            &graph,
            &mut frontier,
            None,
            &Reach { seen: &seen },
            Some(graph.edge_count() as usize + 1),
            Flags::NONE,
        );

        let seen = seen_cells(n);
        let mut frontier = VertexSubset::single(n, 0_u32);
        let mut dense = edge_map(
            &graph,
            &mut frontier,
            None,
            &Reach { seen: &seen },
            Some(0),
            Flags::NONE,
        );

        let mut lhs = sparse.to_sparse().to_vec();
        lhs.sort_unstable();
        let rhs = dense.to_sparse().to_vec();
        assert_eq!(lhs, rhs);
        assert_eq!(lhs, vec![1, 2]);
    }

    #[test]
    fn dense_forward_matches_pull() {
        let graph = test_graph();
        let n = graph.node_count() as usize;

        let seen = seen_cells(n);
        let mut frontier = VertexSubset::sparse(n, vec![0, 1]);
        let mut forward = edge_map(
            &graph,
            &mut frontier,
            None,
            &Reach { seen: &seen },
            Some(0),
            Flags::DENSE_FORWARD,
        );

        let seen = seen_cells(n);
        let mut frontier = VertexSubset::sparse(n, vec![0, 1]);
        let mut pull = edge_map(
            &graph,
            &mut frontier,
            None,
            &Reach { seen: &seen },
            Some(0),
            Flags::NONE,
        );

        assert_eq!(forward.to_sparse(), pull.to_sparse());
        assert_eq!(forward.to_sparse(), &[1, 2, 3]);
    }

    #[test]
    fn no_output_returns_empty() {
        let graph = test_graph();
        let n = graph.node_count() as usize;
        let seen = seen_cells(n);

        let mut frontier = VertexSubset::single(n, 0_u32);
        let next = edge_map(
            &graph,
            &mut frontier,
            None,
            &Reach { seen: &seen },
            None,
            Flags::NO_OUTPUT,
        );

        assert!(next.is_empty());
        // The updates still ran.
        assert_eq!(seen[1].load(Ordering::SeqCst), 0);
        assert_eq!(seen[2].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn supplied_bitmap_is_wrapped() {
        let graph = test_graph();
        let n = graph.node_count() as usize;
        let seen = seen_cells(n);

        let bits = Bitmap::new(n);
        let mut frontier = VertexSubset::single(n, 0_u32);
        let next = edge_map(
            &graph,
            &mut frontier,
            Some(bits.clone()),
            &Reach { seen: &seen },
            Some(graph.edge_count() as usize + 1),
            Flags::NONE,
        );

        assert!(next.is_dense());
        assert_eq!(next.len(), 2);
        assert!(bits.get(1) && bits.get(2));
    }

    /// Claims nothing but always asks for the destination, producing
    /// duplicate output candidates.
    struct Always;

    impl EdgeMapFn<u32> for Always {
        fn update(&self, _: u32, _: u32) -> bool {
            true
        }

        fn update_atomic(&self, _: u32, _: u32) -> bool {
            true
        }
    }

    #[test]
    fn remove_duplicates_keeps_each_destination_once() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .edges(vec![(0, 2), (1, 2), (0, 3), (1, 3)])
            .build();
        let n = graph.node_count() as usize;

        let mut frontier = VertexSubset::sparse(n, vec![0, 1]);
        let mut next = edge_map(
            &graph,
            &mut frontier,
            None,
            &Always,
            Some(usize::MAX),
            Flags::REMOVE_DUPLICATES,
        );

        let mut ids = next.to_sparse().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn cond_filters_destinations() {
        struct OnlyOdd;

        impl EdgeMapFn<u32> for OnlyOdd {
            fn cond(&self, destination: u32) -> bool {
                destination % 2 == 1
            }

            fn update(&self, _: u32, _: u32) -> bool {
                true
            }

            fn update_atomic(&self, _: u32, _: u32) -> bool {
                true
            }
        }

        let graph = test_graph();
        let n = graph.node_count() as usize;

        for threshold in [Some(0), Some(usize::MAX)] {
            let mut frontier = VertexSubset::single(n, 0_u32);
            let mut next = edge_map(&graph, &mut frontier, None, &OnlyOdd, threshold, Flags::NONE);
            assert_eq!(next.to_sparse(), &[1]);
        }
    }
}
