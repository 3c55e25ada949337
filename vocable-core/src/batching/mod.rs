//! Mini-batch construction over variable-length sequences.
//!
//! Two iterator flavours share one padded [`Batch`] type:
//!
//! - [`BucketIterator`] — groups training sequences into length buckets so
//!   each batch pads only to its own bucket's maximum, with optional
//!   per-epoch reshuffling.
//! - [`SimpleIterator`] — fixed-order slicing without bucketing, whose
//!   [`SimpleIterator::whole_set`] form emits exactly one full-dataset batch
//!   for embedding extraction.
//!
//! Both are pure in-memory transformations: no I/O, no blocking, one batch
//! alive at a time. Emitted batches carry the source indices of their rows so
//! callers can map results back onto index-aligned metadata.

pub mod bucket;
pub mod simple;

pub use bucket::BucketIterator;
pub use simple::SimpleIterator;

use ndarray::{s, Array2, Array3};

use crate::error::{Result, VocableError};

/// One padded mini-batch.
///
/// `features` is zero-padded to the longest sequence in *this* batch; the
/// true frame count of row `i` is `lengths[i]`. `labels`, `language_ids` and
/// `indices` are sliced in the same row order.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Padded features, shape (batch, max_len_in_batch, feature_dim).
    pub features: Array3<f32>,
    /// True frame count per row.
    pub lengths: Vec<usize>,
    /// Class id per row, when the iterator was given labels.
    pub labels: Option<Vec<u32>>,
    /// Dense language id per row, when the iterator was given language ids.
    pub language_ids: Option<Vec<u32>>,
    /// Dataset position of each row.
    pub indices: Vec<usize>,
}

impl Batch {
    /// Number of rows in this batch.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Padded length of this batch (the longest member's frame count).
    pub fn max_len(&self) -> usize {
        self.features.shape()[1]
    }
}

/// Shared knobs for both iterator flavours.
#[derive(Debug, Clone)]
pub struct BatchingConfig {
    /// Target rows per batch. The final batch of a bucket may be smaller.
    pub batch_size: usize,
    /// Number of length-quantile buckets. 1 disables bucketing.
    pub n_buckets: usize,
    /// Reshuffle bucket membership (and bucket drain order) every epoch.
    pub shuffle_every_epoch: bool,
    /// RNG seed for all shuffling this iterator performs.
    pub seed: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: 300,
            n_buckets: 3,
            shuffle_every_epoch: true,
            seed: 1,
        }
    }
}

/// Validate the parallel inputs shared by both iterators.
fn validate_inputs(
    sequences: &[Array2<f32>],
    labels: Option<&[u32]>,
    language_ids: Option<&[u32]>,
    batch_size: usize,
) -> Result<()> {
    if sequences.is_empty() {
        return Err(VocableError::InvalidConfig(
            "cannot iterate an empty sequence collection".into(),
        ));
    }
    if batch_size == 0 {
        return Err(VocableError::InvalidConfig("batch_size must be ≥ 1".into()));
    }
    if let Some(labels) = labels {
        if labels.len() != sequences.len() {
            return Err(VocableError::AlignmentMismatch {
                what: "labels",
                got: labels.len(),
                expected: sequences.len(),
            });
        }
    }
    if let Some(ids) = language_ids {
        if ids.len() != sequences.len() {
            return Err(VocableError::AlignmentMismatch {
                what: "language_ids",
                got: ids.len(),
                expected: sequences.len(),
            });
        }
    }
    let dim = sequences[0].ncols();
    if let Some(bad) = sequences.iter().find(|s| s.ncols() != dim) {
        return Err(VocableError::InvalidConfig(format!(
            "feature dimensionality mismatch: expected {dim}, found {}",
            bad.ncols()
        )));
    }
    Ok(())
}

/// Build one zero-padded batch from the given dataset positions.
///
/// Padding is sized to the chunk's own longest member, never a global
/// maximum. A chunk of all-empty sequences yields a (n, 0, dim) tensor.
fn build_batch(
    sequences: &[Array2<f32>],
    labels: Option<&[u32]>,
    language_ids: Option<&[u32]>,
    indices: Vec<usize>,
) -> Batch {
    let dim = sequences[0].ncols();
    let lengths: Vec<usize> = indices.iter().map(|&i| sequences[i].nrows()).collect();
    let max_len = lengths.iter().copied().max().unwrap_or(0);

    let mut features = Array3::<f32>::zeros((indices.len(), max_len, dim));
    for (row, (&i, &len)) in indices.iter().zip(&lengths).enumerate() {
        if len > 0 {
            features
                .slice_mut(s![row, ..len, ..])
                .assign(&sequences[i].slice(s![..len, ..]));
        }
    }

    let labels = labels.map(|l| indices.iter().map(|&i| l[i]).collect());
    let language_ids = language_ids.map(|l| indices.iter().map(|&i| l[i]).collect());

    Batch {
        features,
        lengths,
        labels,
        language_ids,
        indices,
    }
}

/// Lazily yields one [`Batch`] per planned chunk of a single epoch.
pub struct EpochBatches<'a> {
    sequences: &'a [Array2<f32>],
    labels: Option<&'a [u32]>,
    language_ids: Option<&'a [u32]>,
    chunks: std::vec::IntoIter<Vec<usize>>,
}

impl<'a> EpochBatches<'a> {
    fn new(
        sequences: &'a [Array2<f32>],
        labels: Option<&'a [u32]>,
        language_ids: Option<&'a [u32]>,
        chunks: Vec<Vec<usize>>,
    ) -> Self {
        Self {
            sequences,
            labels,
            language_ids,
            chunks: chunks.into_iter(),
        }
    }
}

impl Iterator for EpochBatches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let chunk = self.chunks.next()?;
        Some(build_batch(
            self.sequences,
            self.labels,
            self.language_ids,
            chunk,
        ))
    }
}
