use std::fmt::{Debug, Display};
use std::sync::atomic::Ordering;

use atoi::FromRadix10;
use atomic::Atomic;

/// Abstraction over the types that can be used as vertex identifiers.
///
/// Identifiers are dense, i.e., a graph with `n` vertices uses the ids
/// `0..n`. The all-ones value [`Idx::max_value`] is reserved as the
/// "no vertex" sentinel and never names a real vertex.
pub trait Idx: Copy + Ord + Debug + Display + Send + Sync + Sized + 'static {
    fn new(idx: usize) -> Self;

    fn zero() -> Self;

    /// The sentinel value denoting the absence of a vertex.
    fn max_value() -> Self;

    fn index(self) -> usize;

    /// Parses a decimal id from the given bytes, returning the id and the
    /// number of bytes consumed.
    fn parse(bytes: &[u8]) -> (Self, usize);

    fn atomic(self) -> Atomic<Self> {
        Atomic::new(self)
    }

    fn fetch_add(this: &Atomic<Self>, val: Self, order: Ordering) -> Self;

    fn get_and_increment(this: &Atomic<Self>, order: Ordering) -> Self {
        Self::fetch_add(this, Self::new(1), order)
    }

    fn compare_exchange(
        this: &Atomic<Self>,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

macro_rules! impl_idx {
    ($TYPE:ty) => {
        impl Idx for $TYPE {
            #[inline]
            fn new(idx: usize) -> Self {
                assert!(idx <= <$TYPE>::MAX as usize);
                idx as $TYPE
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn max_value() -> Self {
                <$TYPE>::MAX
            }

            #[inline]
            fn index(self) -> usize {
                self as usize
            }

            #[inline]
            fn parse(bytes: &[u8]) -> (Self, usize) {
                FromRadix10::from_radix_10(bytes)
            }

            #[inline]
            fn fetch_add(this: &Atomic<$TYPE>, val: $TYPE, order: Ordering) -> $TYPE {
                this.fetch_add(val, order)
            }

            #[inline]
            fn compare_exchange(
                this: &Atomic<$TYPE>,
                current: $TYPE,
                new: $TYPE,
                success: Ordering,
                failure: Ordering,
            ) -> Result<$TYPE, $TYPE> {
                this.compare_exchange(current, new, success, failure)
            }
        }
    };
}

impl_idx!(u32);
impl_idx!(u64);
impl_idx!(usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stops_at_separator() {
        let (id, used) = u32::parse(b"1337 42");
        assert_eq!(id, 1337);
        assert_eq!(used, 4);
    }

    #[test]
    fn compare_exchange_claims_once() {
        let cell = u32::max_value().atomic();
        assert!(
            u32::compare_exchange(&cell, u32::MAX, 7, Ordering::SeqCst, Ordering::SeqCst).is_ok()
        );
        assert!(
            u32::compare_exchange(&cell, u32::MAX, 8, Ordering::SeqCst, Ordering::SeqCst).is_err()
        );
        assert_eq!(cell.load(Ordering::SeqCst), 7);
    }
}
