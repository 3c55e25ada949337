//! `StubClassifier` — deterministic placeholder backend without a real
//! network.
//!
//! Exercises the full train/validate pipeline end-to-end: batches route
//! through per-language heads, the loss follows a fixed decay schedule, and
//! `encode` produces embeddings that only depend on the input frames. Used
//! by the integration tests and as the default backend until a real encoder
//! is wired in.

use std::path::Path;

use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batching::Batch;
use crate::error::{Result, VocableError};
use crate::model::WordClassifier;

/// Configuration for [`StubClassifier`].
#[derive(Debug, Clone)]
pub struct StubClassifierConfig {
    /// Output embedding dimensionality.
    pub embedding_dim: usize,
    /// Word class count per language id; one independent head each.
    pub classes_per_language: Vec<usize>,
    /// Per-step multiplicative decay of the loss schedule.
    pub loss_decay: f32,
}

impl Default for StubClassifierConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 130,
            classes_per_language: vec![100],
            loss_decay: 0.05,
        }
    }
}

/// One language's output head. Heads are independent parameter sets; an
/// example only ever touches the head its language id selects.
#[derive(Debug, Clone)]
struct StubHead {
    n_classes: usize,
    steps: u64,
}

impl StubHead {
    /// Deterministic stand-in for a cross-entropy loss: starts at the
    /// uniform-prediction value ln(n_classes) and decays with the head's own
    /// step count.
    fn loss(&self, decay: f32) -> f32 {
        (self.n_classes as f32).ln() / (1.0 + decay * self.steps as f32)
    }
}

/// Deterministic stub backend.
pub struct StubClassifier {
    config: StubClassifierConfig,
    heads: Vec<StubHead>,
    global_step: u64,
}

/// On-disk state written by `save`. The format belongs to the stub alone.
#[derive(Debug, Serialize, Deserialize)]
struct StubCheckpoint {
    global_step: u64,
    head_steps: Vec<u64>,
}

impl StubClassifier {
    /// # Errors
    /// `VocableError::InvalidConfig` for a zero embedding dim, no languages,
    /// or a language with zero classes.
    pub fn new(config: StubClassifierConfig) -> Result<Self> {
        if config.embedding_dim == 0 {
            return Err(VocableError::InvalidConfig(
                "embedding_dim must be ≥ 1".into(),
            ));
        }
        if config.classes_per_language.is_empty() {
            return Err(VocableError::InvalidConfig(
                "at least one language head is required".into(),
            ));
        }
        if let Some(bad) = config
            .classes_per_language
            .iter()
            .position(|&c| c == 0)
        {
            return Err(VocableError::InvalidConfig(format!(
                "language {bad} has zero word classes"
            )));
        }

        let heads = config
            .classes_per_language
            .iter()
            .map(|&n_classes| StubHead {
                n_classes,
                steps: 0,
            })
            .collect();
        Ok(Self {
            config,
            heads,
            global_step: 0,
        })
    }

    /// Per-head step counters, in language id order. Diagnostics only.
    pub fn head_steps(&self) -> Vec<u64> {
        self.heads.iter().map(|h| h.steps).collect()
    }

    /// Resolve the head for one example. Each example maps to exactly one
    /// head; there is no cross-head blending.
    fn head_mut(&mut self, language_id: u32) -> Result<&mut StubHead> {
        let n_languages = self.heads.len();
        self.heads
            .get_mut(language_id as usize)
            .ok_or(VocableError::UnknownLanguage {
                id: language_id,
                n_languages,
            })
    }
}

impl WordClassifier for StubClassifier {
    fn warm_up(&mut self) -> Result<()> {
        debug!("StubClassifier::warm_up — no-op");
        Ok(())
    }

    fn train_step(&mut self, batch: &Batch) -> Result<f32> {
        let labels = batch.labels.as_ref().ok_or_else(|| {
            VocableError::InvalidConfig("training batches require labels".into())
        })?;
        if batch.language_ids.is_none() && self.heads.len() > 1 {
            return Err(VocableError::InvalidConfig(
                "multi-language classifier requires language ids per batch".into(),
            ));
        }

        let mut total = 0.0f32;
        for (row, &class_id) in labels.iter().enumerate() {
            let language_id = batch
                .language_ids
                .as_ref()
                .map_or(0, |ids| ids[row]);
            let decay = self.config.loss_decay;
            let head = self.head_mut(language_id)?;
            if class_id as usize >= head.n_classes {
                return Err(VocableError::ClassOutOfRange {
                    class_id,
                    language_id,
                    n_classes: head.n_classes,
                });
            }
            head.steps += 1;
            total += head.loss(decay);
        }
        self.global_step += 1;
        let mean = total / labels.len().max(1) as f32;
        debug!(
            step = self.global_step,
            batch_len = batch.len(),
            loss = mean,
            "stub train step"
        );
        Ok(mean)
    }

    fn encode(&mut self, batch: &Batch) -> Result<Array2<f32>> {
        let dim = batch.features.shape()[2];
        let mut out = Array2::<f32>::zeros((batch.len(), self.config.embedding_dim));
        if dim == 0 {
            return Ok(out);
        }

        for (row, &len) in batch.lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let frames = batch.features.slice(s![row, ..len, ..]);
            let Some(mean) = frames.mean_axis(Axis(0)) else {
                continue;
            };
            // Cycle the pooled coefficients up to the embedding width,
            // damping each wrap so the projection stays injective enough for
            // distance comparisons.
            for k in 0..self.config.embedding_dim {
                out[[row, k]] = mean[k % dim] / (1.0 + (k / dim) as f32);
            }
        }
        Ok(out)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let state = StubCheckpoint {
            global_step: self.global_step,
            head_steps: self.head_steps(),
        };
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| VocableError::Checkpoint(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "wrote stub checkpoint");
        Ok(())
    }

    fn restore(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        let state: StubCheckpoint =
            serde_json::from_str(&json).map_err(|e| VocableError::Checkpoint(e.to_string()))?;
        if state.head_steps.len() != self.heads.len() {
            return Err(VocableError::Checkpoint(format!(
                "checkpoint has {} heads, classifier has {}",
                state.head_steps.len(),
                self.heads.len()
            )));
        }
        self.global_step = state.global_step;
        for (head, &steps) in self.heads.iter_mut().zip(&state.head_steps) {
            head.steps = steps;
        }
        debug!(path = %path.display(), "restored stub checkpoint");
        Ok(())
    }

    fn reset(&mut self) {
        self.global_step = 0;
        for head in &mut self.heads {
            head.steps = 0;
        }
        debug!("StubClassifier::reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batching::{BatchingConfig, BucketIterator};
    use ndarray::Array2;

    fn config(classes: Vec<usize>) -> StubClassifierConfig {
        StubClassifierConfig {
            embedding_dim: 8,
            classes_per_language: classes,
            loss_decay: 0.05,
        }
    }

    fn batch_of(lengths: &[usize], labels: &[u32], langs: Option<&[u32]>) -> Batch {
        let seqs: Vec<Array2<f32>> = lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Array2::from_elem((len, 3), i as f32 + 1.0))
            .collect();
        let mut it = BucketIterator::new(
            &seqs,
            Some(labels),
            langs,
            BatchingConfig {
                batch_size: lengths.len(),
                n_buckets: 1,
                shuffle_every_epoch: false,
                seed: 0,
            },
        )
        .unwrap();
        it.epoch().next().unwrap()
    }

    #[test]
    fn each_example_routes_to_exactly_its_own_head() {
        let mut model = StubClassifier::new(config(vec![4, 4, 4])).unwrap();
        let batch = batch_of(&[2, 2, 2, 2], &[0, 1, 2, 3], Some(&[2, 0, 2, 2]));
        model.train_step(&batch).unwrap();
        assert_eq!(model.head_steps(), vec![1, 0, 3]);
    }

    #[test]
    fn loss_decays_as_heads_accumulate_steps() {
        let mut model = StubClassifier::new(config(vec![10])).unwrap();
        let batch = batch_of(&[2, 3], &[0, 1], None);
        let first = model.train_step(&batch).unwrap();
        let second = model.train_step(&batch).unwrap();
        let third = model.train_step(&batch).unwrap();
        assert!(first > second && second > third);
        assert!(first <= (10.0f32).ln());
    }

    #[test]
    fn unknown_language_id_fails() {
        let mut model = StubClassifier::new(config(vec![4])).unwrap();
        let batch = batch_of(&[2], &[0], Some(&[5]));
        assert!(matches!(
            model.train_step(&batch),
            Err(VocableError::UnknownLanguage { id: 5, .. })
        ));
    }

    #[test]
    fn class_id_beyond_head_size_fails() {
        let mut model = StubClassifier::new(config(vec![2, 3])).unwrap();
        let batch = batch_of(&[2], &[2], Some(&[0]));
        assert!(matches!(
            model.train_step(&batch),
            Err(VocableError::ClassOutOfRange {
                class_id: 2,
                language_id: 0,
                ..
            })
        ));
    }

    #[test]
    fn multi_language_training_requires_language_ids() {
        let mut model = StubClassifier::new(config(vec![4, 4])).unwrap();
        let batch = batch_of(&[2], &[0], None);
        assert!(matches!(
            model.train_step(&batch),
            Err(VocableError::InvalidConfig(_))
        ));
    }

    #[test]
    fn encode_is_deterministic_and_input_dependent() {
        let mut model = StubClassifier::new(config(vec![4])).unwrap();
        let batch = batch_of(&[2, 2, 4], &[0, 0, 1], None);
        let a = model.encode(&batch).unwrap();
        let b = model.encode(&batch).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nrows(), 3);
        assert_eq!(a.ncols(), 8);
        // Rows 0 and 1 pool different constants, so they must differ.
        assert_ne!(a.row(0), a.row(1));
    }

    #[test]
    fn encode_handles_empty_sequences() {
        let mut model = StubClassifier::new(config(vec![4])).unwrap();
        let batch = batch_of(&[0, 3], &[0, 1], None);
        let z = model.encode(&batch).unwrap();
        assert!(z.row(0).iter().all(|&v| v == 0.0));
        assert!(z.row(1).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn checkpoint_round_trips_head_state() {
        let mut model = StubClassifier::new(config(vec![3, 3])).unwrap();
        let batch = batch_of(&[2, 2], &[0, 1], Some(&[0, 1]));
        model.train_step(&batch).unwrap();
        model.train_step(&batch).unwrap();

        let path = std::env::temp_dir().join(format!(
            "vocable-stub-ckpt-{}.json",
            std::process::id()
        ));
        model.save(&path).unwrap();

        let mut restored = StubClassifier::new(config(vec![3, 3])).unwrap();
        restored.restore(&path).unwrap();
        assert_eq!(restored.head_steps(), model.head_steps());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn restore_rejects_mismatched_head_counts() {
        let model = StubClassifier::new(config(vec![3, 3])).unwrap();
        let path = std::env::temp_dir().join(format!(
            "vocable-stub-mismatch-{}.json",
            std::process::id()
        ));
        model.save(&path).unwrap();

        let mut other = StubClassifier::new(config(vec![3])).unwrap();
        assert!(matches!(
            other.restore(&path),
            Err(VocableError::Checkpoint(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
