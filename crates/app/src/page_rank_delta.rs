//! PageRank-Delta: propagates only the rank change of vertices whose
//! change is still significant, shrinking the frontier as ranks settle.

use std::io;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Instant;

use atomic_float::AtomicF64;
use log::info;
use rayon::prelude::*;

use frontier::prelude::*;

use crate::counters::{result_path, CounterSampler};
use crate::options::AppOptions;
use crate::output::write_output;
use crate::page_rank::{DAMPING, EPSILON};

/// A vertex stays active while its delta exceeds this fraction of its rank.
pub const EPSILON2: f64 = 0.01;

pub struct PageRankDeltaResult {
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub l1_norm: f64,
}

struct DeltaF<'a, G> {
    delta: &'a [AtomicF64],
    ngh_sum: &'a [AtomicF64],
    graph: &'a G,
}

impl<'a, NI, G> EdgeMapFn<NI> for DeltaF<'a, G>
where
    NI: Idx,
    G: DirectedDegrees<NI>,
{
    fn update(&self, source: NI, destination: NI) -> bool {
        let contribution = self.delta[source.index()].load(Ordering::Relaxed)
            / self.graph.out_degree(source).index() as f64;
        let cell = &self.ngh_sum[destination.index()];
        cell.store(cell.load(Ordering::Relaxed) + contribution, Ordering::Relaxed);
        false
    }

    fn update_atomic(&self, source: NI, destination: NI) -> bool {
        let contribution = self.delta[source.index()].load(Ordering::Relaxed)
            / self.graph.out_degree(source).index() as f64;
        self.ngh_sum[destination.index()].fetch_add(contribution, Ordering::Relaxed);
        false
    }
}

pub fn page_rank_delta<NI, G>(graph: &G, max_iterations: usize) -> PageRankDeltaResult
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let edge_count = graph.edge_count().index();
    let one_over_n = 1.0 / node_count as f64;
    let added_constant = (1.0 - DAMPING) * one_over_n;

    let p = (0..node_count)
        .map(|_| AtomicF64::new(0.0))
        .collect::<Vec<_>>();
    // The initial rank mass is seeded as a delta, so the first round
    // propagates it like any later change.
    let delta = (0..node_count)
        .map(|_| AtomicF64::new(one_over_n))
        .collect::<Vec<_>>();
    let ngh_sum = (0..node_count)
        .map(|_| AtomicF64::new(0.0))
        .collect::<Vec<_>>();

    let mut frontier = VertexSubset::<NI>::full(node_count);
    let all = VertexSubset::<NI>::full(node_count);

    let mut iterations = 0;
    let mut l1_norm = 0.0;

    while iterations < max_iterations {
        iterations += 1;
        let start = Instant::now();

        let func = DeltaF {
            delta: &delta,
            ngh_sum: &ngh_sum,
            graph,
        };
        edge_map(
            graph,
            &mut frontier,
            None,
            &func,
            Some(edge_count / 20),
            Flags::NO_OUTPUT | Flags::DENSE_FORWARD,
        );

        let active = if iterations == 1 {
            vertex_filter(&all, |v| {
                let i = v.index();
                let change = DAMPING * ngh_sum[i].load(Ordering::Relaxed) + added_constant;
                p[i].store(p[i].load(Ordering::Relaxed) + change, Ordering::Relaxed);
                // The seeded 1/n was never real rank; take it back out.
                let change = change - one_over_n;
                delta[i].store(change, Ordering::Relaxed);
                change.abs() > EPSILON2 * p[i].load(Ordering::Relaxed)
            })
        } else {
            vertex_filter(&all, |v| {
                let i = v.index();
                let change = ngh_sum[i].load(Ordering::Relaxed) * DAMPING;
                delta[i].store(change, Ordering::Relaxed);
                if change.abs() > EPSILON2 * p[i].load(Ordering::Relaxed) {
                    p[i].store(p[i].load(Ordering::Relaxed) + change, Ordering::Relaxed);
                    true
                } else {
                    false
                }
            })
        };

        l1_norm = (0..node_count)
            .into_par_iter()
            .map(|i| delta[i].load(Ordering::Relaxed).abs())
            .sum();

        info!(
            "Finished iteration {} with {} active vertices and an L1 norm of {:.3e} in {:?}",
            iterations,
            active.len(),
            l1_norm,
            start.elapsed()
        );

        if l1_norm < EPSILON {
            break;
        }

        vertex_map(&all, |v| {
            ngh_sum[v.index()].store(0.0, Ordering::Relaxed);
        });
        frontier = active;
    }

    let scores = p.into_iter().map(AtomicF64::into_inner).collect();

    PageRankDeltaResult {
        scores,
        iterations,
        l1_norm,
    }
}

pub fn run<NI, G>(
    graph: &G,
    options: &AppOptions,
    new_ids: &NewIds<NI>,
    counters: &mut dyn CounterSampler,
) -> io::Result<PageRankDeltaResult>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    counters.reset();
    counters.start();
    let result = page_rank_delta::<NI, G>(graph, options.max_iters);
    counters.stop();
    counters.read_to_file(&result_path(
        "PageRankDelta",
        &options.input_file_name(),
        &options.events,
    ))?;

    if options.write_output {
        write_output(Path::new("."), &result.scores, new_ids)?;
    }

    Ok(result)
}
