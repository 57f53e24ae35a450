//! The loader boundary: in-memory edge lists, the on-disk adjacency format
//! and the optional id permutation produced by an external reordering pass.

use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering::AcqRel;

use atomic::Atomic;
use rayon::prelude::*;

use crate::index::Idx;
use crate::Error;

/// Edge orientation during CSR construction.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A list of directed edges `(source, target)`.
pub struct EdgeList<NI: Idx> {
    edges: Box<[(NI, NI)]>,
}

impl<NI: Idx> EdgeList<NI> {
    pub fn new(edges: Vec<(NI, NI)>) -> Self {
        Self {
            edges: edges.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl ParallelIterator<Item = (NI, NI)> + '_ {
        self.edges.par_iter().copied()
    }

    /// The largest vertex id mentioned by any edge.
    pub fn max_node_id(&self) -> NI {
        self.iter()
            .map(|(source, target)| NI::max(source, target))
            .reduce(NI::zero, NI::max)
    }

    /// Counts per-vertex degrees in the given direction.
    pub fn degrees(&self, node_count: NI, direction: Direction) -> Vec<Atomic<NI>> {
        let mut degrees = Vec::with_capacity(node_count.index());
        degrees.resize_with(node_count.index(), || Atomic::new(NI::zero()));

        match direction {
            Direction::Outgoing => self.iter().for_each(|(source, _)| {
                NI::get_and_increment(&degrees[source.index()], AcqRel);
            }),
            Direction::Incoming => self.iter().for_each(|(_, target)| {
                NI::get_and_increment(&degrees[target.index()], AcqRel);
            }),
        }

        degrees
    }
}

/// Reads the text adjacency format: an `AdjacencyGraph` header line,
/// the vertex count, the edge count, `n` out-list start offsets and `m`
/// edge targets, one decimal token per line.
pub fn read_adjacency<NI: Idx, P: AsRef<Path>>(path: P) -> Result<EdgeList<NI>, Error> {
    let bytes = fs::read(path)?;
    let mut tokens = bytes.split(|byte| byte.is_ascii_whitespace());

    match tokens.next() {
        Some(b"AdjacencyGraph") => {}
        _ => return Err(Error::InvalidInput("missing AdjacencyGraph header")),
    }

    let mut numbers = tokens.filter(|token| !token.is_empty()).map(|token| {
        let (value, used) = NI::parse(token);
        if used == token.len() {
            Ok(value)
        } else {
            Err(Error::InvalidInput("malformed number"))
        }
    });

    let mut next = |what| numbers.next().unwrap_or(Err(Error::InvalidInput(what)));

    let node_count = next("missing vertex count")?.index();
    let edge_count = next("missing edge count")?.index();

    let mut offsets = Vec::with_capacity(node_count + 1);
    for _ in 0..node_count {
        offsets.push(next("truncated offset list")?.index());
    }
    offsets.push(edge_count);

    let mut edges = Vec::with_capacity(edge_count);
    for source in 0..node_count {
        if offsets[source] > offsets[source + 1] || offsets[source + 1] > edge_count {
            return Err(Error::InvalidInput("offsets out of order"));
        }
        for _ in offsets[source]..offsets[source + 1] {
            let target = next("truncated edge list")?;
            if target.index() >= node_count {
                return Err(Error::InvalidInput("edge target out of range"));
            }
            edges.push((NI::new(source), target));
        }
    }

    Ok(EdgeList::new(edges))
}

/// The id permutation handed over by an external reordering pass.
///
/// The on-disk convention is positional: an array whose first two entries
/// are equal means "no preprocessing applied" and carries no mapping.
pub enum NewIds<NI: Idx> {
    Identity,
    Permutation(Box<[NI]>),
}

impl<NI: Idx> NewIds<NI> {
    /// Interprets a raw loader-produced array.
    pub fn from_raw(raw: Vec<NI>) -> Self {
        if raw.len() < 2 || raw[0] == raw[1] {
            NewIds::Identity
        } else {
            NewIds::Permutation(raw.into_boxed_slice())
        }
    }

    /// Reads a permutation file with one decimal id per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let bytes = fs::read(path)?;
        let raw = bytes
            .split(|byte| byte.is_ascii_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                let (value, used) = NI::parse(token);
                if used == token.len() {
                    Ok(value)
                } else {
                    Err(Error::InvalidInput("malformed id in permutation file"))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_raw(raw))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, NewIds::Identity)
    }

    /// Maps an external vertex id to the internal one.
    pub fn translate(&self, vertex: NI) -> NI {
        match self {
            NewIds::Identity => vertex,
            NewIds::Permutation(ids) => ids[vertex.index()],
        }
    }
}
