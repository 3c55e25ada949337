//! Length-bucketed training iterator.
//!
//! ## Bucketing algorithm
//!
//! 1. Sort example indices by sequence length (stable, so ties keep dataset
//!    order).
//! 2. Partition the sorted indices into `n_buckets` contiguous, near-equal
//!    groups — the boundaries are length quantiles, fixed for the iterator's
//!    lifetime.
//! 3. Per epoch: optionally reshuffle each bucket's member order and the
//!    order buckets are drained in.
//! 4. Slice each bucket into `batch_size` chunks; the final chunk of a
//!    bucket may be smaller and is emitted, never dropped.
//! 5. Pad each chunk to its own maximum length only.
//!
//! Versus a single global-max batch, this bounds padding waste by the length
//! spread *within* a bucket instead of across the whole dataset.

use ndarray::Array2;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::debug;

use super::{validate_inputs, BatchingConfig, EpochBatches};
use crate::error::{Result, VocableError};

/// Restartable bucketed batch iterator.
///
/// Each call to [`BucketIterator::epoch`] regenerates bucket membership order
/// (reshuffled when configured) and yields a lazy stream of batches covering
/// every example exactly once.
pub struct BucketIterator<'a> {
    sequences: &'a [Array2<f32>],
    labels: Option<&'a [u32]>,
    language_ids: Option<&'a [u32]>,
    batch_size: usize,
    shuffle_every_epoch: bool,
    /// Member indices per bucket, in ascending-length order. Boundaries are
    /// fixed at construction; only the order within is ever reshuffled.
    buckets: Vec<Vec<usize>>,
    rng: StdRng,
}

impl<'a> BucketIterator<'a> {
    /// Build the bucket partition for `sequences`.
    ///
    /// `labels` and `language_ids` are optional parallel arrays sliced into
    /// every emitted batch when present.
    ///
    /// # Errors
    /// - `VocableError::InvalidConfig` for a zero batch size or bucket
    ///   count, an empty sequence collection, or mixed feature dims.
    /// - `VocableError::AlignmentMismatch` for parallel array length
    ///   mismatches.
    pub fn new(
        sequences: &'a [Array2<f32>],
        labels: Option<&'a [u32]>,
        language_ids: Option<&'a [u32]>,
        config: BatchingConfig,
    ) -> Result<Self> {
        validate_inputs(sequences, labels, language_ids, config.batch_size)?;
        if config.n_buckets == 0 {
            return Err(VocableError::InvalidConfig("n_buckets must be ≥ 1".into()));
        }

        let n = sequences.len();
        let mut sorted: Vec<usize> = (0..n).collect();
        sorted.sort_by_key(|&i| sequences[i].nrows());

        // Quantile boundaries: bucket k covers sorted[k*n/B .. (k+1)*n/B].
        // With more buckets than examples some buckets come out empty; they
        // simply contribute no batches.
        let n_buckets = config.n_buckets;
        let buckets: Vec<Vec<usize>> = (0..n_buckets)
            .map(|k| sorted[k * n / n_buckets..(k + 1) * n / n_buckets].to_vec())
            .collect();

        debug!(
            n_examples = n,
            n_buckets,
            batch_size = config.batch_size,
            shuffle_every_epoch = config.shuffle_every_epoch,
            "bucket boundaries fixed"
        );

        Ok(Self {
            sequences,
            labels,
            language_ids,
            batch_size: config.batch_size,
            shuffle_every_epoch: config.shuffle_every_epoch,
            buckets,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Number of batches one epoch will emit.
    pub fn batches_per_epoch(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.len().div_ceil(self.batch_size))
            .sum()
    }

    /// Start a fresh pass over the dataset.
    ///
    /// With `shuffle_every_epoch` set, bucket membership order and bucket
    /// drain order are re-drawn from the iterator's RNG, so successive
    /// epochs generally differ while identically-seeded iterators agree.
    pub fn epoch(&mut self) -> EpochBatches<'a> {
        let mut buckets = self.buckets.clone();
        if self.shuffle_every_epoch {
            for bucket in &mut buckets {
                bucket.shuffle(&mut self.rng);
            }
            buckets.shuffle(&mut self.rng);
        }

        let chunks: Vec<Vec<usize>> = buckets
            .iter()
            .flat_map(|bucket| bucket.chunks(self.batch_size).map(<[usize]>::to_vec))
            .collect();

        EpochBatches::new(self.sequences, self.labels, self.language_ids, chunks)
    }
}
