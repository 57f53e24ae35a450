//! Breadth-first search producing the parent of every reached vertex.

use std::io;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Instant;

use atomic::Atomic;
use log::info;
use rayon::prelude::*;

use frontier::prelude::*;

use crate::counters::{result_path, CounterSampler};
use crate::options::AppOptions;
use crate::output::write_output;

pub struct BfsResult<NI> {
    /// `parents[v]` is the vertex that discovered `v`, the source for the
    /// source itself, and the sentinel for unreached vertices.
    pub parents: Vec<NI>,
    /// Number of edge_map rounds until the frontier drained.
    pub iterations: usize,
    /// Number of vertices in the BFS tree.
    pub tree_size: usize,
}

struct BfsF<'a, NI: Idx> {
    parents: &'a [Atomic<NI>],
    next: Bitmap,
}

impl<'a, NI: Idx> EdgeMapFn<NI> for BfsF<'a, NI> {
    fn update(&self, source: NI, destination: NI) -> bool {
        let parent = &self.parents[destination.index()];
        if parent.load(Ordering::Relaxed) == NI::max_value() {
            parent.store(source, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn update_atomic(&self, source: NI, destination: NI) -> bool {
        let parent = &self.parents[destination.index()];
        if parent.load(Ordering::Relaxed) == NI::max_value()
            && NI::compare_exchange(
                parent,
                NI::max_value(),
                source,
                Ordering::SeqCst,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            // Claimed: membership is announced through the bitmap.
            self.next.set(destination.index());
        }
        false
    }
}

pub fn bfs<NI, G>(graph: &G, source: NI) -> BfsResult<NI>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let node_count = graph.node_count().index();

    let parents = (0..node_count)
        .into_par_iter()
        .map(|_| Atomic::new(NI::max_value()))
        .collect::<Vec<_>>();
    parents[source.index()].store(source, Ordering::Relaxed);

    let mut frontier = VertexSubset::single(node_count, source);
    let mut iterations = 0;

    while !frontier.is_empty() {
        let start = Instant::now();
        let next = Bitmap::new(node_count);
        let func = BfsF {
            parents: &parents,
            next: next.clone(),
        };
        frontier = edge_map(
            graph,
            &mut frontier,
            Some(next),
            &func,
            None,
            Flags::DENSE_FORWARD,
        );
        iterations += 1;
        info!(
            "Finished iteration {} with {} discovered vertices in {:?}",
            iterations,
            frontier.len(),
            start.elapsed()
        );
    }

    let parents = parents
        .into_iter()
        .map(Atomic::into_inner)
        .collect::<Vec<_>>();
    let tree_size = parents
        .par_iter()
        .filter(|&&parent| parent != NI::max_value())
        .count();

    BfsResult {
        parents,
        iterations,
        tree_size,
    }
}

pub fn run<NI, G>(
    graph: &G,
    options: &AppOptions,
    new_ids: &NewIds<NI>,
    counters: &mut dyn CounterSampler,
) -> io::Result<BfsResult<NI>>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let source = new_ids.translate(NI::new(options.source));

    counters.reset();
    counters.start();
    let result = bfs(graph, source);
    counters.stop();
    counters.read_to_file(&result_path(
        "BFS",
        &options.input_file_name(),
        &options.events,
    ))?;

    if options.write_output {
        write_output(Path::new("."), &result.parents, new_ids)?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    #[test]
    fn path_graph() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .edges(vec![(0, 1), (1, 2), (2, 3)])
            .build();

        let result = bfs(&graph, 0_u32);

        assert_eq!(result.parents, vec![0, 0, 1, 2]);
        assert_eq!(result.iterations, 4);
        assert_eq!(result.tree_size, 4);
    }

    #[test]
    fn disconnected_pairs() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .edges(vec![(0, 1), (1, 0), (2, 3), (3, 2)])
            .build();

        let result = bfs(&graph, 0_u32);

        assert_eq!(result.parents, vec![0, 0, u32::MAX, u32::MAX]);
        assert_eq!(result.tree_size, 2);
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
    fn tree_size_matches_sequential_reachability() {
        let mut rng = StdRng::seed_from_u64(0xbf5);

        for n in [10, 100, 400] {
            let mut edges = vec![(n as u32 - 1, 0)];
            for s in 0..n as u32 {
                for t in 0..n as u32 {
                    if rng.gen_bool(0.02) {
                        edges.push((s, t));
                    }
                }
            }
            let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
                .csr_layout(CsrLayout::Deduplicated)
                .edges(edges)
                .build();
            let source = rng.gen_range(0..n) as u32;

            let result = bfs(&graph, source);
            assert_eq!(result.tree_size, reference_reachable(&graph, source));
        }
    }

    #[test]
    fn parents_are_tree_edges() {
        let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
            .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 1)])
            .build();

        let result = bfs(&graph, 0_u32);

        assert_eq!(result.parents[0], 0);
        for v in 1..4_u32 {
            let parent = result.parents[v as usize];
            assert!(graph.out_neighbors(parent).contains(&v));
        }
    }
}
