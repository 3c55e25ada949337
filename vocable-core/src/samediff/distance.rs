//! Pairwise distance utilities shared by the evaluator.
//!
//! All pair-indexed vectors in this crate use one canonical ordering: the
//! strictly upper triangle of the n×n pair matrix, row-major — pair (i, j)
//! with i < j, i varying slowest. Distances and match arrays are only
//! comparable because they are enumerated identically.

use ndarray::{Array2, Axis};
use tracing::warn;

/// Number of unordered pairs over `n` items.
pub fn num_pairs(n: usize) -> usize {
    n * (n - 1) / 2
}

/// Condensed cosine distance over every unordered row pair, in canonical
/// pair order.
///
/// A zero-norm row cannot define an angle; it is treated as maximally
/// distant (distance 1.0) from everything rather than poisoning the ranking
/// with NaN.
pub fn cosine_pdist(embeddings: &Array2<f32>) -> Vec<f32> {
    let n = embeddings.nrows();
    let norms: Vec<f32> = embeddings
        .rows()
        .into_iter()
        .map(|row| row.dot(&row).sqrt())
        .collect();
    if norms.iter().any(|&v| v == 0.0) {
        warn!("zero-norm embedding present — its distances degrade to 1.0");
    }

    let mut distances = Vec::with_capacity(num_pairs(n));
    for i in 0..n {
        let a = embeddings.row(i);
        for j in (i + 1)..n {
            let denom = norms[i] * norms[j];
            let d = if denom == 0.0 {
                1.0
            } else {
                1.0 - a.dot(&embeddings.row(j)) / denom
            };
            distances.push(d);
        }
    }
    distances
}

/// Standardize each dimension to zero mean and unit variance over the given
/// embedding set.
///
/// A zero-variance dimension keeps its (constant) centered value of 0.0 —
/// the divisor is clamped to 1.0 instead of dividing by zero.
pub fn standardize(embeddings: &Array2<f32>) -> Array2<f32> {
    let Some(mean) = embeddings.mean_axis(Axis(0)) else {
        return embeddings.clone();
    };
    let mut std = embeddings.std_axis(Axis(0), 0.0);
    std.mapv_inplace(|v| if v == 0.0 { 1.0 } else { v });
    (embeddings - &mean) / &std
}
