pub use crate::builder::GraphBuilder;

pub use crate::graph::CsrLayout;
pub use crate::graph::DirectedCsrGraph;
pub use crate::graph::Transposed;

pub use crate::subset::Bitmap;
pub use crate::subset::VertexSubset;

pub use crate::edge_map::edge_map;
pub use crate::edge_map::EdgeMapFn;
pub use crate::edge_map::Flags;

pub use crate::vertex_map::vertex_filter;
pub use crate::vertex_map::vertex_map;

pub use crate::index::Idx;
pub use atomic::Atomic;

pub use crate::input::Direction;
pub use crate::input::EdgeList;
pub use crate::input::NewIds;

pub use crate::DirectedDegrees;
pub use crate::DirectedNeighbors;
pub use crate::Graph;

pub use crate::Error;
