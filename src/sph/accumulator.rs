use rayon::prelude::*;
use std::ops::AddAssign;

/// A private per-worker accumulator that can be folded into another one.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl<T: AddAssign + Copy> Merge for Vec<T> {
    fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.iter_mut().zip(other) {
            *a += b;
        }
    }
}

impl<A: Merge, B: Merge> Merge for (A, B) {
    fn merge(&mut self, other: Self) {
        self.0.merge(other.0);
        self.1.merge(other.1);
    }
}

impl<A: Merge, B: Merge, C: Merge> Merge for (A, B, C) {
    fn merge(&mut self, other: Self) {
        self.0.merge(other.0);
        self.1.merge(other.1);
        self.2.merge(other.2);
    }
}

/// Splits `0..num_items` into `num_workers` contiguous chunks, folds each chunk into its own
/// accumulator created by `zero` and then merges all partial results sequentially in chunk order.
///
/// The result only depends on `num_workers`, not on thread scheduling.
pub fn accumulate<A, Z, F>(num_items: usize, num_workers: usize, zero: Z, accumulate_item: F) -> A
where
    A: Merge + Send,
    Z: Fn() -> A + Sync,
    F: Fn(&mut A, usize) + Sync,
{
    let num_workers = num_workers.max(1);
    let chunk_size = ((num_items + num_workers - 1) / num_workers).max(1);
    let num_chunks = (num_items + chunk_size - 1) / chunk_size;

    let partials: Vec<A> = (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let mut private = zero();
            let end = ((chunk + 1) * chunk_size).min(num_items);
            for item in chunk * chunk_size..end {
                accumulate_item(&mut private, item);
            }
            private
        })
        .collect();

    let mut result = zero();
    for partial in partials {
        result.merge(partial);
    }
    result
}

/// [`accumulate`] over the elements of a slice.
pub fn accumulate_slice<T, A, Z, F>(items: &[T], num_workers: usize, zero: Z, accumulate_item: F) -> A
where
    T: Sync,
    A: Merge + Send,
    Z: Fn() -> A + Sync,
    F: Fn(&mut A, &T) + Sync,
{
    accumulate(items.len(), num_workers, zero, |private, k| accumulate_item(private, &items[k]))
}
