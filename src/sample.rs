//! Bounded random sampling for prompt context.
//!
//! Keeps the prompt size stable regardless of the result-set size.
//! Fresh entropy on every call — no fixed seed — because the point is
//! to vary prompt context across repeated requests for the same query.

use rand::seq::SliceRandom;

/// Uniform random subset without replacement, size `min(n, len)`.
///
/// An empty input yields an empty subset, not an error. Callers must
/// treat "no context found" (empty input) as a distinct case from an
/// empty sample and surface a fallback payload instead of generating.
pub fn sample<T: Clone>(items: &[T], sample_size: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    items
        .choose_multiple(&mut rng, sample_size.min(items.len()))
        .cloned()
        .collect()
}
