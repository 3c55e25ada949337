//! Word classifier abstraction.
//!
//! The `WordClassifier` trait decouples the training loop and the evaluator
//! from any specific network backend. The contract is deliberately opaque:
//! a batch goes in, a scalar loss or an embedding matrix comes out, and
//! checkpoint formats are the implementation's own business.
//!
//! `&mut self` on `train_step`/`encode` expresses that classifiers are
//! stateful — optimizer moments, hidden states, step counters. All mutation
//! is serialised through `ClassifierHandle`'s `parking_lot::Mutex`.

pub mod stub;

pub use stub::{StubClassifier, StubClassifierConfig};

use std::path::Path;
use std::sync::Arc;

use ndarray::Array2;
use parking_lot::Mutex;

use crate::batching::Batch;
use crate::error::Result;

/// Contract for word classifier backends.
pub trait WordClassifier: Send + 'static {
    /// One-time warm-up: allocate parameters, prime caches. Called once
    /// before the first epoch.
    ///
    /// # Errors
    /// Returns an error if the backend cannot initialise.
    fn warm_up(&mut self) -> Result<()>;

    /// Run one optimisation step on a padded batch and return its mean loss.
    ///
    /// The batch must carry labels; language ids route each example to its
    /// language's output head.
    fn train_step(&mut self, batch: &Batch) -> Result<f32>;

    /// Embed a batch through the shared encoder, one row per batch row.
    ///
    /// Output heads play no part here — embeddings come from the encoder
    /// that all languages share.
    fn encode(&mut self, batch: &Batch) -> Result<Array2<f32>>;

    /// Persist the classifier state to `path`. Format is backend-defined.
    fn save(&self, path: &Path) -> Result<()>;

    /// Load classifier state previously written by `save`.
    fn restore(&mut self, path: &Path) -> Result<()>;

    /// Reset all mutable training state.
    fn reset(&mut self);
}

/// Thread-safe reference-counted handle to any `WordClassifier` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning behaviour on panic — a failed
/// validation pass must not wedge the training loop's next epoch.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<Mutex<dyn WordClassifier>>);

impl ClassifierHandle {
    /// Wrap any `WordClassifier` in a `ClassifierHandle`.
    pub fn new<M: WordClassifier>(model: M) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}
