//! Data-parallel building blocks over contiguous index ranges.
//!
//! Every operation in here is a fork-join step: it returns only after all
//! iterations have completed. Ordering within a step is unspecified.

use std::sync::atomic::{AtomicU64, Ordering};

use atomic::Atomic;
use rayon::prelude::*;

use crate::index::Idx;
use crate::SharedMut;

/// Block size for the two-pass scan and pack implementations. Inputs at or
/// below this size are processed sequentially.
const GRAIN: usize = 16384;

/// Applies `f(i)` for every `i` in `0..n` in parallel.
pub fn parallel_for<F>(n: usize, f: F)
where
    F: Fn(usize) + Sync + Send,
{
    (0..n).into_par_iter().for_each(f);
}

/// Exclusive prefix sum. The result has `counts.len() + 1` entries, with
/// `result[0] == 0` and `result[counts.len()]` holding the total.
pub fn prefix_sum(counts: &[usize]) -> Vec<usize> {
    let n = counts.len();
    let mut sums = vec![0_usize; n + 1];

    if n <= GRAIN {
        let mut total = 0;
        for (sum, &count) in sums.iter_mut().zip(counts) {
            *sum = total;
            total += count;
        }
        sums[n] = total;
        return sums;
    }

    let block_sums = counts
        .par_chunks(GRAIN)
        .map(|block| block.iter().sum::<usize>())
        .collect::<Vec<_>>();

    let mut block_offsets = Vec::with_capacity(block_sums.len());
    let mut total = 0;
    for block_sum in block_sums {
        block_offsets.push(total);
        total += block_sum;
    }
    sums[n] = total;

    sums[..n]
        .par_chunks_mut(GRAIN)
        .zip(counts.par_chunks(GRAIN))
        .zip(block_offsets)
        .for_each(|((sums, counts), mut running)| {
            for (sum, &count) in sums.iter_mut().zip(counts) {
                *sum = running;
                running += count;
            }
        });

    sums
}

/// Gathers the elements for which `keep` is true, preserving input order.
pub fn pack<T, F>(items: &[T], keep: F) -> Vec<T>
where
    T: Copy + Send + Sync,
    F: Fn(&T) -> bool + Sync,
{
    let counts = items
        .par_chunks(GRAIN)
        .map(|block| block.iter().filter(|item| keep(item)).count())
        .collect::<Vec<_>>();
    let offsets = prefix_sum(&counts);
    let len = offsets[counts.len()];

    let mut packed = Vec::<T>::with_capacity(len);
    let packed_ptr = SharedMut::new(packed.as_mut_ptr());

    // Each block writes into its own half-open target range, so the
    // positions never overlap.
    items
        .par_chunks(GRAIN)
        .zip(offsets)
        .for_each(|(block, mut position)| {
            for item in block {
                if keep(item) {
                    unsafe { packed_ptr.add(position).write(*item) };
                    position += 1;
                }
            }
        });

    // SAFETY: the blocks above wrote exactly `len` elements in total.
    unsafe { packed.set_len(len) };
    packed
}

/// Gathers `items[i]` for every `i` with `flags[i]` set, preserving order.
pub fn pack_flagged<T>(items: &[T], flags: &[bool]) -> Vec<T>
where
    T: Copy + Send + Sync,
{
    debug_assert_eq!(items.len(), flags.len());

    let counts = flags
        .par_chunks(GRAIN)
        .map(|block| block.iter().filter(|flag| **flag).count())
        .collect::<Vec<_>>();
    let offsets = prefix_sum(&counts);
    let len = offsets[counts.len()];

    let mut packed = Vec::<T>::with_capacity(len);
    let packed_ptr = SharedMut::new(packed.as_mut_ptr());

    items
        .par_chunks(GRAIN)
        .zip(flags.par_chunks(GRAIN))
        .zip(offsets)
        .for_each(|((block, flags), mut position)| {
            for (item, &flag) in block.iter().zip(flags) {
                if flag {
                    unsafe { packed_ptr.add(position).write(*item) };
                    position += 1;
                }
            }
        });

    // SAFETY: the blocks above wrote exactly `len` elements in total.
    unsafe { packed.set_len(len) };
    packed
}

/// Reduces `items` with the associative operation `op`.
pub fn reduce<T, Op>(items: &[T], identity: T, op: Op) -> T
where
    T: Copy + Send + Sync,
    Op: Fn(T, T) -> T + Sync,
{
    items.par_iter().copied().reduce(|| identity, &op)
}

/// Splits `buffer` into one mutable slice per entry of `counts`, where the
/// i-th slice has length `counts[i]`. The sum of all counts must not exceed
/// the buffer length.
pub fn split_by_counts<'buf, T>(mut buffer: &'buf mut [T], counts: &[usize]) -> Vec<&'buf mut [T]> {
    let mut slices = Vec::with_capacity(counts.len());
    for &count in counts {
        let (head, tail) = buffer.split_at_mut(count);
        slices.push(head);
        buffer = tail;
    }
    slices
}

/// Atomically lowers `cell` to `value`. Returns true iff the store happened,
/// i.e. `value` was smaller than the current content.
pub fn write_min<NI: Idx>(cell: &Atomic<NI>, value: NI) -> bool {
    let mut current = cell.load(Ordering::Relaxed);
    while value < current {
        match NI::compare_exchange(cell, current, value, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
    false
}

/// Atomically adds `value` to `cell`, returning the previous content.
pub fn write_add<NI: Idx>(cell: &Atomic<NI>, value: NI) -> NI {
    NI::fetch_add(cell, value, Ordering::AcqRel)
}

/// Atomically ors `bits` into `cell`. Returns true iff the content changed.
pub fn write_or(cell: &AtomicU64, bits: u64) -> bool {
    let previous = cell.fetch_or(bits, Ordering::AcqRel);
    previous | bits != previous
}
