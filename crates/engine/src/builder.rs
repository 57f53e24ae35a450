use std::path::{Path, PathBuf};

use crate::graph::{CsrLayout, DirectedCsrGraph};
use crate::index::Idx;
use crate::input::{read_adjacency, EdgeList};
use crate::Error;

pub struct Uninitialized {
    csr_layout: CsrLayout,
}

pub struct FromEdges<NI: Idx> {
    csr_layout: CsrLayout,
    edges: Vec<(NI, NI)>,
}

pub struct FromPath {
    csr_layout: CsrLayout,
    path: PathBuf,
}

/// A builder to create directed graphs in a staged way.
///
/// # Examples
///
/// Create a graph from a vec of edges:
///
/// ```
/// use frontier::prelude::*;
///
/// let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
///     .edges(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
///     .build();
///
/// assert_eq!(graph.node_count(), 4);
/// assert_eq!(graph.edge_count(), 5);
/// ```
pub struct GraphBuilder<State> {
    state: State,
}

impl Default for GraphBuilder<Uninitialized> {
    fn default() -> Self {
        GraphBuilder::new()
    }
}

impl GraphBuilder<Uninitialized> {
    pub fn new() -> Self {
        Self {
            state: Uninitialized {
                csr_layout: CsrLayout::default(),
            },
        }
    }

    /// Sets the [`CsrLayout`] to use during CSR construction.
    pub fn csr_layout(mut self, csr_layout: CsrLayout) -> Self {
        self.state.csr_layout = csr_layout;
        self
    }

    /// Builds the graph from the given edge tuples.
    pub fn edges<NI, Edges>(self, edges: Edges) -> GraphBuilder<FromEdges<NI>>
    where
        NI: Idx,
        Edges: IntoIterator<Item = (NI, NI)>,
    {
        GraphBuilder {
            state: FromEdges {
                csr_layout: self.state.csr_layout,
                edges: edges.into_iter().collect(),
            },
        }
    }

    /// Reads the graph from the given adjacency file.
    pub fn path<P: AsRef<Path>>(self, path: P) -> GraphBuilder<FromPath> {
        GraphBuilder {
            state: FromPath {
                csr_layout: self.state.csr_layout,
                path: path.as_ref().to_path_buf(),
            },
        }
    }
}

impl<NI: Idx> GraphBuilder<FromEdges<NI>> {
    pub fn build(self) -> DirectedCsrGraph<NI> {
        DirectedCsrGraph::from((EdgeList::new(self.state.edges), self.state.csr_layout))
    }
}

impl GraphBuilder<FromPath> {
    pub fn build<NI: Idx>(self) -> Result<DirectedCsrGraph<NI>, Error> {
        let edges = read_adjacency(&self.state.path)?;
        Ok(DirectedCsrGraph::from((edges, self.state.csr_layout)))
    }
}
