//! PageRank by power iteration with an L1-norm stopping rule.

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

pub const DAMPING: f64 = 0.85;
pub const EPSILON: f64 = 1e-7;

pub struct PageRankResult {
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub l1_norm: f64,
}

struct PrF<'a, G> {
    p_curr: &'a [AtomicF64],
    p_next: &'a [AtomicF64],
    graph: &'a G,
}

impl<'a, NI, G> EdgeMapFn<NI> for PrF<'a, G>
where
    NI: Idx,
    G: DirectedDegrees<NI>,
{
    fn update(&self, source: NI, destination: NI) -> bool {
        let contribution = self.p_curr[source.index()].load(Ordering::Relaxed)
            / self.graph.out_degree(source).index() as f64;
        let cell = &self.p_next[destination.index()];
        cell.store(cell.load(Ordering::Relaxed) + contribution, Ordering::Relaxed);
        false
    }

    fn update_atomic(&self, source: NI, destination: NI) -> bool {
        let contribution = self.p_curr[source.index()].load(Ordering::Relaxed)
            / self.graph.out_degree(source).index() as f64;
        self.p_next[destination.index()].fetch_add(contribution, Ordering::Relaxed);
        false
    }
}

pub fn page_rank<NI, G>(graph: &G, max_iterations: usize) -> PageRankResult
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let node_count = graph.node_count().index();
    let one_over_n = 1.0 / node_count as f64;
    let added_constant = (1.0 - DAMPING) * one_over_n;

    let mut p_curr = (0..node_count)
        .map(|_| AtomicF64::new(one_over_n))
        .collect::<Vec<_>>();
    let mut p_next = (0..node_count)
        .map(|_| AtomicF64::new(0.0))
        .collect::<Vec<_>>();

    let mut frontier = VertexSubset::<NI>::full(node_count);
    let mut iterations = 0;
    let mut l1_norm = 0.0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        let start = Instant::now();

        let func = PrF {
            p_curr: &p_curr,
            p_next: &p_next,
            graph,
        };
        edge_map(
            graph,
            &mut frontier,
            None,
            &func,
            None,
            Flags::NO_OUTPUT | Flags::DENSE_FORWARD,
        );

        vertex_map(&frontier, |v| {
            let cell = &p_next[v.index()];
            cell.store(
                DAMPING * cell.load(Ordering::Relaxed) + added_constant,
                Ordering::Relaxed,
            );
        });

        l1_norm = (0..node_count)
            .into_par_iter()
            .map(|i| {
                (p_curr[i].load(Ordering::Relaxed) - p_next[i].load(Ordering::Relaxed)).abs()
            })
            .sum();

        info!(
            "Finished iteration {} with an L1 norm of {:.3e} in {:?}",
            iterations,
            l1_norm,
            start.elapsed()
        );

        if l1_norm < EPSILON {
            converged = true;
            break;
        }

        vertex_map(&frontier, |v| {
            p_curr[v.index()].store(0.0, Ordering::Relaxed);
        });
        std::mem::swap(&mut p_curr, &mut p_next);
    }

    let scores = if converged { p_next } else { p_curr };
    let scores = scores.into_iter().map(AtomicF64::into_inner).collect();

    PageRankResult {
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
) -> io::Result<PageRankResult>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    counters.reset();
    counters.start();
    let result = page_rank::<NI, G>(graph, options.max_iters);
    counters.stop();
    counters.read_to_file(&result_path(
        "PageRank",
        &options.input_file_name(),
        &options.events,
    ))?;

    if options.write_output {
        write_output(Path::new("."), &result.scores, new_ids)?;
    }

    Ok(result)
}
