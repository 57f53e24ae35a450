//! A frontier-centric parallel graph processing engine.
//!
//! The engine runs iterative vertex-centric computations over a static
//! directed graph held entirely in memory. A computation keeps a set of
//! active vertices, the *frontier*, and repeatedly transforms it with
//! [`edge_map`](edge_map::edge_map): a user-supplied update is applied
//! along every edge leaving the frontier and the successful updates form
//! the next frontier. The engine picks between pushing along the
//! frontier's out-edges and pulling over in-edges based on how much edge
//! work the frontier represents, so traversals stay cheap both for tiny
//! and for near-full frontiers.
//!
//! The graph is stored as Compressed-Sparse-Row in both directions, which
//! gives constant-time degrees and contiguous neighbor lists. All engine
//! steps are fork-join parallel on top of [rayon](https://docs.rs/rayon)
//! and complete before they return; writes of one step are visible to the
//! next.
//!
//! # Example
//!
//! A breadth-first relaxation that records each vertex's discoverer:
//!
//! ```
//! use std::sync::atomic::Ordering;
//!
//! use atomic::Atomic;
//! use frontier::prelude::*;
//!
//! struct Discover<'a> {
//!     parents: &'a [Atomic<u32>],
//! }
//!
//! impl<'a> EdgeMapFn<u32> for Discover<'a> {
//!     fn update(&self, s: u32, d: u32) -> bool {
//!         if self.parents[d as usize].load(Ordering::Relaxed) == u32::MAX {
//!             self.parents[d as usize].store(s, Ordering::Relaxed);
//!             return true;
//!         }
//!         false
//!     }
//!
//!     fn update_atomic(&self, s: u32, d: u32) -> bool {
//!         u32::compare_exchange(
//!             &self.parents[d as usize],
//!             u32::MAX,
//!             s,
//!             Ordering::SeqCst,
//!             Ordering::SeqCst,
//!         )
//!         .is_ok()
//!     }
//! }
//!
//! let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
//!     .edges(vec![(0, 1), (1, 2), (2, 3)])
//!     .build();
//!
//! let n = graph.node_count() as usize;
//! let parents: Vec<Atomic<u32>> = (0..n).map(|_| Atomic::new(u32::MAX)).collect();
//! parents[0].store(0, Ordering::Relaxed);
//!
//! let mut frontier = VertexSubset::single(n, 0_u32);
//! while !frontier.is_empty() {
//!     frontier = edge_map(
//!         &graph,
//!         &mut frontier,
//!         None,
//!         &Discover { parents: &parents },
//!         None,
//!         Flags::NONE,
//!     );
//! }
//!
//! let parents: Vec<u32> = parents.into_iter().map(Atomic::into_inner).collect();
//! assert_eq!(parents, vec![0, 0, 1, 2]);
//! ```

pub mod builder;
pub mod edge_map;
pub mod graph;
pub mod index;
pub mod input;
pub mod par;
pub mod prelude;
pub mod subset;
pub mod vertex_map;

pub use crate::builder::GraphBuilder;
pub use crate::graph::CsrLayout;
pub use crate::graph::DirectedCsrGraph;
pub use crate::graph::Transposed;
pub use crate::subset::Bitmap;
pub use crate::subset::VertexSubset;

use crate::index::Idx;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while loading graph")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("invalid graph input: {0}")]
    InvalidInput(&'static str),
}

/// A directed graph over the dense vertex ids `0..node_count`.
pub trait Graph<NI: Idx> {
    /// Returns the number of vertices in the graph.
    fn node_count(&self) -> NI;

    /// Returns the number of directed edges in the graph.
    fn edge_count(&self) -> NI;
}

pub trait DirectedDegrees<NI: Idx> {
    /// Returns the number of edges where the given vertex is a source.
    fn out_degree(&self, vertex: NI) -> NI;

    /// Returns the number of edges where the given vertex is a target.
    fn in_degree(&self, vertex: NI) -> NI;
}

/// Neighbor access in both directions.
///
/// Neighbor lists are exposed as slices: the traversal executors index
/// into them from parallel inner loops and slice them by destination
/// range, which an opaque iterator cannot support in constant time.
pub trait DirectedNeighbors<NI: Idx> {
    /// Returns all vertices connected by an edge leaving the given vertex.
    fn out_neighbors(&self, vertex: NI) -> &[NI];

    /// Returns all vertices connected by an edge entering the given vertex.
    fn in_neighbors(&self, vertex: NI) -> &[NI];
}

#[repr(transparent)]
pub struct SharedMut<T>(*mut T);
unsafe impl<T: Send> Send for SharedMut<T> {}
unsafe impl<T: Sync> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    pub fn new(ptr: *mut T) -> Self {
        SharedMut(ptr)
    }

    delegate::delegate! {
        to self.0 {
            /// # Safety
            ///
            /// Ensure that `count` does not exceed the capacity of the Vec.
            pub unsafe fn add(&self, count: usize) -> *mut T;
        }
    }
}
