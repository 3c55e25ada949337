//! Fixed-epoch training loop.
//!
//! ## Per epoch
//!
//! ```text
//! 1. Draw a fresh (possibly reshuffled) pass from the bucket iterator
//! 2. model.train_step(batch) for every batch; average the losses
//! 3. Save the intermediate checkpoint
//! 4. On validation epochs: run the external validation closure
//!    (lower = better) and save the best-validation checkpoint on
//!    improvement
//! 5. Append an EpochRecord
//! ```
//!
//! Validation is a closure rather than a trait so the caller decides what
//! "score" means — the trainer binary plugs in a same-different pass over a
//! held-out language and negates the AP so that minimising the score
//! maximises the metric.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::batching::BucketIterator;
use crate::error::{Result, VocableError};
use crate::model::ClassifierHandle;

/// Epoch-loop knobs.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Total epochs to run.
    pub n_epochs: usize,
    /// Run validation every this many epochs.
    pub n_val_interval: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_epochs: 10,
            n_val_interval: 1,
        }
    }
}

/// One epoch's outcome, serialisable into the experiment record.
#[derive(Debug, Clone, Serialize)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Mean per-batch training loss.
    pub train_loss: f32,
    /// Wall-clock seconds spent in this epoch (training only).
    pub epoch_time_s: f64,
    /// External validation score (lower = better), on validation epochs.
    pub val_score: Option<f64>,
}

/// Where checkpoints go during training.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointPaths<'p> {
    /// Written after every epoch.
    pub intermediate: &'p Path,
    /// Written whenever the validation score improves.
    pub best: Option<&'p Path>,
}

/// Train for a fixed number of epochs, optionally validating on an interval.
///
/// `validate` is called with no arguments and returns a score where lower is
/// better; it runs *after* the epoch's intermediate checkpoint is saved, so
/// a crash mid-validation never loses the epoch. The best-validation
/// checkpoint is only written on strict improvement.
///
/// # Errors
/// - `VocableError::InvalidConfig` for a zero epoch count or validation
///   interval.
/// - Any error from `train_step`, checkpointing, or the validation closure
///   aborts the loop immediately.
pub fn fixed_epochs(
    config: &TrainConfig,
    model: &ClassifierHandle,
    batches: &mut BucketIterator<'_>,
    mut validate: Option<&mut dyn FnMut() -> Result<f64>>,
    paths: CheckpointPaths<'_>,
) -> Result<Vec<EpochRecord>> {
    if config.n_epochs == 0 {
        return Err(VocableError::InvalidConfig("n_epochs must be ≥ 1".into()));
    }
    if config.n_val_interval == 0 {
        return Err(VocableError::InvalidConfig(
            "n_val_interval must be ≥ 1".into(),
        ));
    }

    let mut records = Vec::with_capacity(config.n_epochs);
    let mut best_score = f64::INFINITY;

    for epoch in 1..=config.n_epochs {
        let started = Instant::now();
        let mut total_loss = 0.0f64;
        let mut n_batches = 0usize;
        for batch in batches.epoch() {
            let loss = model.0.lock().train_step(&batch)?;
            total_loss += f64::from(loss);
            n_batches += 1;
            debug!(epoch, n_batches, loss, "batch complete");
        }
        let train_loss = (total_loss / n_batches as f64) as f32;
        let epoch_time_s = started.elapsed().as_secs_f64();

        model.0.lock().save(paths.intermediate)?;

        let val_score = match validate.as_mut() {
            Some(validate) if epoch % config.n_val_interval == 0 => {
                let score = validate()?;
                if score < best_score {
                    best_score = score;
                    if let Some(best) = paths.best {
                        model.0.lock().save(best)?;
                        info!(epoch, score, "new best validation score");
                    }
                }
                Some(score)
            }
            _ => None,
        };

        info!(
            epoch,
            train_loss,
            epoch_time_s,
            val_score = val_score.unwrap_or(f64::NAN),
            "epoch complete"
        );
        records.push(EpochRecord {
            epoch,
            train_loss,
            epoch_time_s,
            val_score,
        });
    }

    Ok(records)
}
