//! Bootstrap resampling.
//!
//! Every bootstrap routine resamples through [`draw_sample`]: it draws the
//! forecasts (or targets) and gets back the indices to apply to the paired
//! array.

use rand::Rng;

/// Draw `n` indices uniformly from `0..n` with replacement.
///
/// Returns an empty vector when `n == 0`.
pub fn sample_indices<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Draw one bootstrap sample of `values`.
///
/// Returns the resampled values together with the chosen indices, so the
/// same indices can be applied to a paired array (e.g. observed labels).
///
/// # Example
///
/// ```rust
/// use wxeval_core::{draw_sample, Seed};
///
/// let probs = [0.1, 0.4, 0.9];
/// let (sample, indices) = draw_sample(&probs, &mut Seed::new(3).to_rng());
/// assert_eq!(sample.len(), 3);
/// for (value, &i) in sample.iter().zip(&indices) {
///     assert_eq!(*value, probs[i]);
/// }
/// ```
pub fn draw_sample<T: Clone, R: Rng + ?Sized>(values: &[T], rng: &mut R) -> (Vec<T>, Vec<usize>) {
    let indices = sample_indices(values.len(), rng);
    let sampled = indices.iter().map(|&i| values[i].clone()).collect();
    (sampled, indices)
}
