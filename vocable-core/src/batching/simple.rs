//! Non-bucketed batch iterator, and the whole-set evaluation pass.
//!
//! The general form slices the dataset in index order (optionally reshuffled
//! per epoch) into fixed-size batches. The [`SimpleIterator::whole_set`] form
//! exists for embedding extraction: its contract is *exactly one
//! full-dataset batch in fixed traversal order*, which keeps the mapping
//! from embedding rows back to metadata trivial — row `i` is example
//! `batch.indices[i]`, and the indices are simply `0..n`.

use ndarray::Array2;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::{build_batch, validate_inputs, Batch, EpochBatches};
use crate::error::{Result, VocableError};

/// Fixed-order batch iterator without bucketing.
pub struct SimpleIterator<'a> {
    sequences: &'a [Array2<f32>],
    labels: Option<&'a [u32]>,
    language_ids: Option<&'a [u32]>,
    batch_size: usize,
    shuffle_every_epoch: bool,
    rng: StdRng,
}

impl<'a> SimpleIterator<'a> {
    /// Create an iterator yielding `batch_size` examples at a time in index
    /// order (reshuffled each epoch when `shuffle_every_epoch` is set).
    ///
    /// # Errors
    /// Same construction errors as [`super::BucketIterator::new`], minus the
    /// bucket count.
    pub fn new(
        sequences: &'a [Array2<f32>],
        labels: Option<&'a [u32]>,
        language_ids: Option<&'a [u32]>,
        batch_size: usize,
        shuffle_every_epoch: bool,
        seed: u64,
    ) -> Result<Self> {
        validate_inputs(sequences, labels, language_ids, batch_size)?;
        Ok(Self {
            sequences,
            labels,
            language_ids,
            batch_size,
            shuffle_every_epoch,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// The evaluation variant: batch size equal to the dataset size, no
    /// shuffling, no bucketing.
    pub fn whole_set(
        sequences: &'a [Array2<f32>],
        labels: Option<&'a [u32]>,
        language_ids: Option<&'a [u32]>,
    ) -> Result<Self> {
        Self::new(sequences, labels, language_ids, sequences.len(), false, 0)
    }

    /// Start a fresh pass over the dataset.
    pub fn epoch(&mut self) -> EpochBatches<'a> {
        let mut order: Vec<usize> = (0..self.sequences.len()).collect();
        if self.shuffle_every_epoch {
            order.shuffle(&mut self.rng);
        }
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        EpochBatches::new(self.sequences, self.labels, self.language_ids, chunks)
    }

    /// The single full-dataset batch, rows in index order `0..n`.
    ///
    /// Only valid on a [`SimpleIterator::whole_set`] iterator — on any other
    /// configuration the "exactly one batch" contract would be a lie, so
    /// this fails instead.
    pub fn single_full_batch(&self) -> Result<Batch> {
        if self.batch_size != self.sequences.len() || self.shuffle_every_epoch {
            return Err(VocableError::InvalidConfig(
                "single_full_batch requires a whole-set iterator".into(),
            ));
        }
        Ok(build_batch(
            self.sequences,
            self.labels,
            self.language_ids,
            (0..self.sequences.len()).collect(),
        ))
    }
}
