//! The immutable dual-CSR directed graph.

use std::sync::atomic::Ordering::Acquire;
use std::time::Instant;

use atomic::Atomic;
use log::info;
use rayon::prelude::*;

use crate::index::Idx;
use crate::input::{Direction, EdgeList};
use crate::par::prefix_sum;
use crate::{DirectedDegrees, DirectedNeighbors, Graph, SharedMut};

/// Defines how the neighbor list of individual vertices are organized
/// within the CSR target array.
#[derive(Clone, Copy, Debug, Default)]
pub enum CsrLayout {
    /// Neighbor lists are sorted by target id. This is the default; the
    /// dense-forward executor relies on it.
    #[default]
    Sorted,
    /// Neighbor lists keep the input order.
    Unsorted,
    /// Neighbor lists are sorted and parallel edges are removed.
    Deduplicated,
}

/// A compressed-sparse-row adjacency structure.
///
/// `offsets` has `n + 1` entries, `targets` has `m` entries. The neighbor
/// list of vertex `v` is `targets[offsets[v]..offsets[v + 1]]`, giving O(1)
/// degree lookups and contiguous O(deg) enumeration.
#[derive(Debug)]
pub struct Csr<NI: Idx> {
    offsets: Box<[NI]>,
    targets: Box<[NI]>,
}

impl<NI: Idx> Csr<NI> {
    #[inline]
    pub(crate) fn node_count(&self) -> NI {
        NI::new(self.offsets.len() - 1)
    }

    #[inline]
    pub(crate) fn edge_count(&self) -> NI {
        NI::new(self.targets.len())
    }

    #[inline]
    pub(crate) fn degree(&self, vertex: NI) -> NI {
        let from = self.offsets[vertex.index()];
        let to = self.offsets[vertex.index() + 1];

        NI::new(to.index() - from.index())
    }

    #[inline]
    pub(crate) fn targets(&self, vertex: NI) -> &[NI] {
        let from = self.offsets[vertex.index()];
        let to = self.offsets[vertex.index() + 1];

        &self.targets[from.index()..to.index()]
    }

    fn from_edges(
        edges: &EdgeList<NI>,
        node_count: NI,
        direction: Direction,
        layout: CsrLayout,
    ) -> Self {
        let start = Instant::now();
        let degrees = edges.degrees(node_count, direction);
        let offsets = prefix_sum_atomic(degrees);
        info!("Computed degrees and offsets in {:?}", start.elapsed());

        let start = Instant::now();
        let edge_count = offsets[node_count.index()].load(Acquire).index();
        let mut targets = Vec::<NI>::with_capacity(edge_count);
        let targets_ptr = SharedMut::new(targets.as_mut_ptr());

        // The offsets are a prefix sum of the degrees, so claiming a slot
        // with get_and_increment yields a distinct position per edge and no
        // two tasks ever write the same index.
        edges.iter().for_each(|(source, target)| {
            let (from, to) = match direction {
                Direction::Outgoing => (source, target),
                Direction::Incoming => (target, source),
            };
            let position = NI::get_and_increment(&offsets[from.index()], Acquire);

            unsafe { targets_ptr.add(position.index()).write(to) };
        });

        // SAFETY: the scatter above wrote one target per edge.
        unsafe { targets.set_len(edge_count) };
        info!("Computed target array in {:?}", start.elapsed());

        // Each claimed slot moved the per-vertex offset forward by one, so
        // the offsets are now shifted by a single position.
        let mut offsets = offsets
            .into_iter()
            .map(Atomic::into_inner)
            .collect::<Vec<_>>();
        offsets.rotate_right(1);
        offsets[0] = NI::zero();

        let (offsets, targets) = match layout {
            CsrLayout::Unsorted => (offsets, targets),
            CsrLayout::Sorted => {
                sort_lists(&offsets, &mut targets);
                (offsets, targets)
            }
            CsrLayout::Deduplicated => sort_and_deduplicate_lists(&offsets, &mut targets),
        };

        Self {
            offsets: offsets.into_boxed_slice(),
            targets: targets.into_boxed_slice(),
        }
    }
}

fn prefix_sum_atomic<NI: Idx>(degrees: Vec<Atomic<NI>>) -> Vec<Atomic<NI>> {
    let mut last = degrees.last().map_or(NI::zero(), |d| d.load(Acquire));
    let mut sums = degrees
        .into_iter()
        .scan(NI::zero(), |total, degree| {
            let value = *total;
            *total = NI::new(total.index() + degree.into_inner().index());
            Some(Atomic::new(value))
        })
        .collect::<Vec<_>>();

    last = NI::new(last.index() + sums.last().map_or(0, |s| s.load(Acquire).index()));
    sums.push(Atomic::new(last));

    sums
}

fn list_slices<'targets, NI: Idx>(
    offsets: &[NI],
    targets: &'targets mut [NI],
) -> Vec<&'targets mut [NI]> {
    let node_count = offsets.len() - 1;
    let mut slices = Vec::with_capacity(node_count);
    let mut tail = targets;
    let mut previous = offsets[0];

    for &offset in &offsets[1..] {
        let (list, remainder) = tail.split_at_mut(offset.index() - previous.index());
        slices.push(list);
        tail = remainder;
        previous = offset;
    }

    slices
}

fn sort_lists<NI: Idx>(offsets: &[NI], targets: &mut [NI]) {
    list_slices(offsets, targets)
        .par_iter_mut()
        .for_each(|list| list.sort_unstable());
}

fn sort_and_deduplicate_lists<NI: Idx>(
    offsets: &[NI],
    targets: &mut [NI],
) -> (Vec<NI>, Vec<NI>) {
    let node_count = offsets.len() - 1;

    let mut new_degrees = Vec::with_capacity(node_count);
    list_slices(offsets, targets)
        .par_iter_mut()
        .map(|list| {
            list.sort_unstable();
            let mut keep = 0;
            for read in 0..list.len() {
                if keep == 0 || list[read] != list[keep - 1] {
                    list[keep] = list[read];
                    keep += 1;
                }
            }
            keep
        })
        .collect_into_vec(&mut new_degrees);

    let new_offsets = prefix_sum(&new_degrees);
    let edge_count = new_offsets[node_count];

    let mut new_targets = Vec::<NI>::with_capacity(edge_count);
    let new_targets_ptr = SharedMut::new(new_targets.as_mut_ptr());

    let targets = &*targets;
    (0..node_count).into_par_iter().for_each(|v| {
        let source = offsets[v].index();
        let position = new_offsets[v];
        for i in 0..new_degrees[v] {
            unsafe { new_targets_ptr.add(position + i).write(targets[source + i]) };
        }
    });

    // SAFETY: the loop above copied the first new_degrees[v] targets of
    // every list into disjoint positions covering 0..edge_count.
    unsafe { new_targets.set_len(edge_count) };

    let new_offsets = new_offsets.into_iter().map(NI::new).collect();

    (new_offsets, new_targets)
}

/// An immutable directed graph with both outgoing and incoming CSR lists.
pub struct DirectedCsrGraph<NI: Idx> {
    csr_out: Csr<NI>,
    csr_inc: Csr<NI>,
}

impl<NI: Idx> DirectedCsrGraph<NI> {
    pub(crate) fn new(csr_out: Csr<NI>, csr_inc: Csr<NI>) -> Self {
        let graph = Self { csr_out, csr_inc };
        info!(
            "Created directed graph (node_count = {:?}, edge_count = {:?})",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }
}

impl<NI: Idx> Graph<NI> for DirectedCsrGraph<NI> {
    delegate::delegate! {
        to self.csr_out {
            fn node_count(&self) -> NI;
            fn edge_count(&self) -> NI;
        }
    }
}

impl<NI: Idx> DirectedDegrees<NI> for DirectedCsrGraph<NI> {
    fn out_degree(&self, vertex: NI) -> NI {
        self.csr_out.degree(vertex)
    }

    fn in_degree(&self, vertex: NI) -> NI {
        self.csr_inc.degree(vertex)
    }
}

impl<NI: Idx> DirectedNeighbors<NI> for DirectedCsrGraph<NI> {
    fn out_neighbors(&self, vertex: NI) -> &[NI] {
        self.csr_out.targets(vertex)
    }

    fn in_neighbors(&self, vertex: NI) -> &[NI] {
        self.csr_inc.targets(vertex)
    }
}

impl<NI: Idx> From<(EdgeList<NI>, CsrLayout)> for DirectedCsrGraph<NI> {
    fn from((edges, layout): (EdgeList<NI>, CsrLayout)) -> Self {
        info!("Creating directed graph");
        let node_count = NI::new(edges.max_node_id().index() + 1);

        let start = Instant::now();
        let csr_out = Csr::from_edges(&edges, node_count, Direction::Outgoing, layout);
        info!("Created outgoing csr in {:?}", start.elapsed());

        let start = Instant::now();
        let csr_inc = Csr::from_edges(&edges, node_count, Direction::Incoming, layout);
        info!("Created incoming csr in {:?}", start.elapsed());

        DirectedCsrGraph::new(csr_out, csr_inc)
    }
}

/// A borrowed view of a directed graph with all edges reversed.
///
/// Degree and neighbor lookups swap the outgoing and incoming surface; the
/// underlying graph is untouched.
pub struct Transposed<'g, G>(&'g G);

impl<'g, G> Transposed<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self(graph)
    }
}

impl<NI: Idx, G: Graph<NI>> Graph<NI> for Transposed<'_, G> {
    delegate::delegate! {
        to self.0 {
            fn node_count(&self) -> NI;
            fn edge_count(&self) -> NI;
        }
    }
}

impl<NI: Idx, G: DirectedDegrees<NI>> DirectedDegrees<NI> for Transposed<'_, G> {
    fn out_degree(&self, vertex: NI) -> NI {
        self.0.in_degree(vertex)
    }

    fn in_degree(&self, vertex: NI) -> NI {
        self.0.out_degree(vertex)
    }
}

impl<NI: Idx, G: DirectedNeighbors<NI>> DirectedNeighbors<NI> for Transposed<'_, G> {
    fn out_neighbors(&self, vertex: NI) -> &[NI] {
        self.0.in_neighbors(vertex)
    }

    fn in_neighbors(&self, vertex: NI) -> &[NI] {
        self.0.out_neighbors(vertex)
    }
}
