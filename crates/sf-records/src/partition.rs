use std::num::NonZeroUsize;

/// Split `items` into contiguous batches of at most `batch_size`.
///
/// Order is preserved within and across batches; only the last batch may be
/// short, and an empty input yields no batches.
pub fn partition<T>(items: &[T], batch_size: NonZeroUsize) -> Vec<&[T]> {
    items.chunks(batch_size.get()).collect()
}
