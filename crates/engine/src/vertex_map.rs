//! Parallel per-vertex application and filtering over a frontier.

use crate::index::Idx;
use crate::par::parallel_for;
use crate::subset::{filter_sparse, Bitmap, VertexSubset};

use rayon::prelude::*;

/// Applies `func` to every member of `subset` in parallel.
pub fn vertex_map<NI, F>(subset: &VertexSubset<NI>, func: F)
where
    NI: Idx,
    F: Fn(NI) + Sync,
{
    if let Some(ids) = subset.sparse_ids() {
        ids.par_iter().for_each(|&vertex| func(vertex));
    } else if let Some(bits) = subset.dense_bits() {
        parallel_for(subset.node_count(), |v| {
            if bits.get(v) {
                func(NI::new(v));
            }
        });
    }
}

/// Applies `func` to every member of `subset` in parallel and returns the
/// subset of members for which it returned true. `func` is called exactly
/// once per member.
pub fn vertex_filter<NI, F>(subset: &VertexSubset<NI>, func: F) -> VertexSubset<NI>
where
    NI: Idx,
    F: Fn(NI) -> bool + Sync,
{
    let node_count = subset.node_count();

    if let Some(ids) = subset.sparse_ids() {
        let flags = ids.par_iter().map(|&vertex| func(vertex)).collect::<Vec<_>>();
        filter_sparse(node_count, ids, &flags)
    } else if let Some(bits) = subset.dense_bits() {
        let kept = Bitmap::new(node_count);
        parallel_for(node_count, |v| {
            if bits.get(v) && func(NI::new(v)) {
                kept.set(v);
            }
        });
        VertexSubset::dense(node_count, kept)
    } else {
        VertexSubset::empty(node_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn map_visits_every_member_once() {
        let visits = (0..10).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();
        let subset = VertexSubset::<u32>::sparse(10, vec![1, 4, 7]);

        vertex_map(&subset, |v| {
            visits[v as usize].fetch_add(1, Ordering::Relaxed);
        });

        let counts = visits
            .iter()
            .map(|v| v.load(Ordering::SeqCst))
            .collect::<Vec<_>>();
        assert_eq!(counts, vec![0, 1, 0, 0, 1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn filter_keeps_exactly_the_matching_members() {
        let subset = VertexSubset::<u32>::sparse(12, vec![0, 3, 6, 9, 10]);
        let mut kept = vertex_filter(&subset, |v| v % 3 == 0);

        assert_eq!(kept.to_sparse(), &[0, 3, 6, 9]);
    }

    #[test]
    fn filter_on_dense_input_stays_dense() {
        let subset = VertexSubset::<u32>::full(8);
        let kept = vertex_filter(&subset, |v| v < 3);

        assert!(kept.is_dense());
        assert_eq!(kept.len(), 3);
        assert!(kept.contains(0) && kept.contains(1) && kept.contains(2));
        assert!(!kept.contains(3));
    }

    #[test]
    fn filter_universe_is_preserved() {
        let subset = VertexSubset::<u32>::sparse(42, vec![41]);
        let kept = vertex_filter(&subset, |_| false);

        assert_eq!(kept.node_count(), 42);
        assert!(kept.is_empty());
    }
}
