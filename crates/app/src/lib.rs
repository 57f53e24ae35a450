//! Applications built on the frontier engine: breadth-first search,
//! PageRank, PageRank-Delta and multi-source radii estimation, plus the
//! harness they share (options, counters, output files).

pub mod bfs;
pub mod counters;
pub mod options;
pub mod output;
pub mod page_rank;
pub mod page_rank_delta;
pub mod radii;
