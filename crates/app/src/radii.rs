//! Multi-source radii estimation: up to 64 breadth-first searches run
//! simultaneously, one per bit of a per-vertex visited word. A vertex's
//! radius estimate is the last round in which any search reached it.
//!
//! Bits are propagated over the transposed graph, so the estimate for a
//! vertex is the longest shortest path *from* it to any sampled source,
//! i.e. a lower bound on its forward eccentricity. On symmetric graphs the
//! two orientations coincide.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use frontier::par::write_or;
use frontier::prelude::*;

use crate::counters::{result_path, CounterSampler};
use crate::options::AppOptions;
use crate::output::write_output;

pub struct RadiiResult {
    /// Estimated radius per vertex; -1 for vertices no search reached.
    pub radii: Vec<i32>,
    /// Number of edge_map rounds until the frontier drained.
    pub rounds: i32,
}

struct RadiiF<'a> {
    visited: &'a [AtomicU64],
    next_visited: &'a [AtomicU64],
    radii: &'a [AtomicI32],
    round: i32,
    next: Bitmap,
}

impl<'a, NI: Idx> EdgeMapFn<NI> for RadiiF<'a> {
    fn update(&self, source: NI, destination: NI) -> bool {
        let d = destination.index();
        let to_write =
            self.visited[d].load(Ordering::Relaxed) | self.visited[source.index()].load(Ordering::Relaxed);
        if self.visited[d].load(Ordering::Relaxed) != to_write {
            let next = &self.next_visited[d];
            next.store(next.load(Ordering::Relaxed) | to_write, Ordering::Relaxed);
            if self.radii[d].load(Ordering::Relaxed) != self.round {
                self.radii[d].store(self.round, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn update_atomic(&self, source: NI, destination: NI) -> bool {
        let d = destination.index();
        let to_write =
            self.visited[d].load(Ordering::Relaxed) | self.visited[source.index()].load(Ordering::Relaxed);
        if self.visited[d].load(Ordering::Relaxed) != to_write {
            write_or(&self.next_visited[d], to_write);
            let observed = self.radii[d].load(Ordering::Relaxed);
            if observed != self.round
                && self.radii[d]
                    .compare_exchange(observed, self.round, Ordering::SeqCst, Ordering::Relaxed)
                    .is_ok()
            {
                // Won this round's claim; announce through the bitmap.
                self.next.set(d);
            }
        }
        false
    }
}

/// Mixes `x` into a pseudo-random word; used to draw source samples.
fn hash_mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn sample_sources<NI: Idx>(node_count: usize, new_ids: &NewIds<NI>) -> Vec<NI> {
    let sample_size = usize::min(node_count, 64);

    let mut sources = if node_count <= 64 {
        (0..node_count)
            .map(|v| new_ids.translate(NI::new(v)))
            .collect::<Vec<_>>()
    } else {
        (0..sample_size)
            .map(|i| {
                let v = (hash_mix(i as u64) % node_count as u64) as usize;
                new_ids.translate(NI::new(v))
            })
            .collect()
    };

    sources.sort_unstable();
    sources.dedup();
    sources
}

pub fn radii<NI, G>(graph: &G, new_ids: &NewIds<NI>) -> RadiiResult
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    let node_count = graph.node_count().index();

    let radii = (0..node_count)
        .into_par_iter()
        .map(|_| AtomicI32::new(-1))
        .collect::<Vec<_>>();
    let visited = (0..node_count)
        .into_par_iter()
        .map(|_| AtomicU64::new(0))
        .collect::<Vec<_>>();
    let next_visited = (0..node_count)
        .into_par_iter()
        .map(|_| AtomicU64::new(0))
        .collect::<Vec<_>>();

    let sources = sample_sources(node_count, new_ids);
    for (bit, source) in sources.iter().enumerate() {
        radii[source.index()].store(0, Ordering::Relaxed);
        next_visited[source.index()].store(1 << bit, Ordering::Relaxed);
    }
    info!("Sampled {} sources", sources.len());

    let transposed = Transposed::new(graph);
    let mut frontier = VertexSubset::sparse(node_count, sources);
    let mut round = 0;

    while !frontier.is_empty() {
        round += 1;
        let start = Instant::now();

        vertex_map(&frontier, |v| {
            let i = v.index();
            visited[i].store(next_visited[i].load(Ordering::Relaxed), Ordering::Relaxed);
        });

        let next = Bitmap::new(node_count);
        let func = RadiiF {
            visited: &visited,
            next_visited: &next_visited,
            radii: &radii,
            round,
            next: next.clone(),
        };
        frontier = edge_map(
            &transposed,
            &mut frontier,
            Some(next),
            &func,
            None,
            Flags::DENSE_FORWARD,
        );

        info!(
            "Finished round {} with {} changed vertices in {:?}",
            round,
            frontier.len(),
            start.elapsed()
        );
    }

    let radii = radii
        .into_iter()
        .map(AtomicI32::into_inner)
        .collect::<Vec<_>>();

    RadiiResult { radii, rounds: round }
}

pub fn run<NI, G>(
    graph: &G,
    options: &AppOptions,
    new_ids: &NewIds<NI>,
    counters: &mut dyn CounterSampler,
) -> io::Result<RadiiResult>
where
    NI: Idx,
    G: Graph<NI> + DirectedDegrees<NI> + DirectedNeighbors<NI> + Sync,
{
    counters.reset();
    counters.start();
    let result = radii(graph, new_ids);
    counters.stop();
    counters.read_to_file(&result_path(
        "Radii",
        &options.input_file_name(),
        &options.events,
    ))?;

    if options.write_output {
        write_output(Path::new("."), &result.radii, new_ids)?;
    }

    Ok(result)
}
