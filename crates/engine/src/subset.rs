//! The frontier representation: a subset of the vertex ids `0..n` with a
//! sparse (id array) and a dense (bitmap) form.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::index::Idx;
use crate::par::{pack_flagged, parallel_for, prefix_sum};
use crate::SharedMut;

/// A fixed-size boolean array that tolerates concurrent writers.
///
/// Engine executors and user callbacks may mark bits from parallel tasks;
/// marking is idempotent, so racy duplicate stores are harmless. Cloning is
/// cheap and yields a handle to the same bits.
#[derive(Clone)]
pub struct Bitmap {
    bits: Arc<[AtomicBool]>,
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        let bits = (0..len).map(|_| AtomicBool::new(false)).collect::<Vec<_>>();
        Self { bits: bits.into() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, index: usize) {
        self.bits[index].store(true, Ordering::Relaxed);
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.bits
            .par_iter()
            .filter(|bit| bit.load(Ordering::Relaxed))
            .count()
    }

    /// The indices of all set bits, in ascending order.
    pub fn ones<NI: Idx>(&self) -> Vec<NI> {
        const BLOCK: usize = 4096;

        let counts = self
            .bits
            .par_chunks(BLOCK)
            .map(|block| {
                block
                    .iter()
                    .filter(|bit| bit.load(Ordering::Relaxed))
                    .count()
            })
            .collect::<Vec<_>>();
        let offsets = prefix_sum(&counts);
        let len = offsets[counts.len()];

        let mut ones = Vec::<NI>::with_capacity(len);
        let ones_ptr = SharedMut::new(ones.as_mut_ptr());

        self.bits
            .par_chunks(BLOCK)
            .enumerate()
            .for_each(|(block_index, block)| {
                let mut position = offsets[block_index];
                for (bit_index, bit) in block.iter().enumerate() {
                    if bit.load(Ordering::Relaxed) {
                        let id = NI::new(block_index * BLOCK + bit_index);
                        unsafe { ones_ptr.add(position).write(id) };
                        position += 1;
                    }
                }
            });

        // SAFETY: the blocks above wrote exactly `len` ids in total.
        unsafe { ones.set_len(len) };
        ones
    }
}

/// A subset of the vertices `0..n`, used as the frontier of a traversal.
///
/// The subset carries up to two materialized representations: an unordered
/// array of member ids and a bitmap over the full universe. Conversions are
/// lazy and idempotent; once materialized, both forms describe the same set
/// until the subset is dropped. The member count is cached.
pub struct VertexSubset<NI: Idx> {
    node_count: usize,
    len: usize,
    sparse: Option<Box<[NI]>>,
    dense: Option<Bitmap>,
}

impl<NI: Idx> VertexSubset<NI> {
    /// The empty subset over a universe of `node_count` vertices.
    pub fn empty(node_count: usize) -> Self {
        Self {
            node_count,
            len: 0,
            sparse: Some(Box::default()),
            dense: None,
        }
    }

    /// The singleton subset `{vertex}`.
    pub fn single(node_count: usize, vertex: NI) -> Self {
        Self {
            node_count,
            len: 1,
            sparse: Some(vec![vertex].into_boxed_slice()),
            dense: None,
        }
    }

    /// Builds a subset from distinct member ids.
    pub fn sparse(node_count: usize, ids: Vec<NI>) -> Self {
        Self {
            node_count,
            len: ids.len(),
            sparse: Some(ids.into_boxed_slice()),
            dense: None,
        }
    }

    /// Wraps a bitmap whose set bits are the members.
    pub fn dense(node_count: usize, bits: Bitmap) -> Self {
        debug_assert_eq!(node_count, bits.len());
        Self {
            node_count,
            len: bits.count(),
            sparse: None,
            dense: Some(bits),
        }
    }

    /// The full subset `0..node_count`.
    pub fn full(node_count: usize) -> Self {
        let bits = Bitmap::new(node_count);
        parallel_for(node_count, |v| bits.set(v));
        Self {
            node_count,
            len: node_count,
            sparse: None,
            dense: Some(bits),
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_sparse(&self) -> bool {
        self.sparse.is_some()
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.dense.is_some()
    }

    /// Membership test. Intended for assertions and tests, not hot loops.
    pub fn contains(&self, vertex: NI) -> bool {
        if let Some(bits) = &self.dense {
            bits.get(vertex.index())
        } else if let Some(ids) = &self.sparse {
            ids.contains(&vertex)
        } else {
            false
        }
    }

    /// The member ids if the sparse form is materialized.
    pub fn sparse_ids(&self) -> Option<&[NI]> {
        self.sparse.as_deref()
    }

    /// The bitmap if the dense form is materialized.
    pub fn dense_bits(&self) -> Option<&Bitmap> {
        self.dense.as_ref()
    }

    /// Materializes and returns the sparse form. When converted from a
    /// bitmap, the ids come out in ascending order.
    pub fn to_sparse(&mut self) -> &[NI] {
        if self.sparse.is_none() {
            let bits = self.dense.as_ref().expect("subset without representation");
            let ids = bits.ones::<NI>();
            debug_assert_eq!(ids.len(), self.len);
            self.sparse = Some(ids.into_boxed_slice());
        }
        self.sparse.as_deref().unwrap()
    }

    /// Materializes and returns the dense form.
    pub fn to_dense(&mut self) -> &Bitmap {
        if self.dense.is_none() {
            let ids = self.sparse.as_deref().expect("subset without representation");
            let bits = Bitmap::new(self.node_count);
            ids.par_iter().for_each(|id| bits.set(id.index()));
            self.dense = Some(bits);
        }
        self.dense.as_ref().unwrap()
    }
}

/// Keeps the members for which `flags` is set. `flags` is positional with
/// respect to `ids`.
pub(crate) fn filter_sparse<NI: Idx>(
    node_count: usize,
    ids: &[NI],
    flags: &[bool],
) -> VertexSubset<NI> {
    VertexSubset::sparse(node_count, pack_flagged(ids, flags))
}
