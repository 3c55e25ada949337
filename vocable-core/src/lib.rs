//! # vocable-core
//!
//! Training pipeline for multilingual acoustic word embeddings.
//!
//! ## Architecture
//!
//! ```text
//! WordDataset ─► BucketIterator ─► Batch ─► WordClassifier::train_step
//!      │                                          │
//!      └─► SimpleIterator::whole_set ─► Batch ─► WordClassifier::encode
//!                                                  │
//!                                   samediff::SameDifferentReport
//! ```
//!
//! The bucket iterator groups variable-length feature sequences by length so
//! each mini-batch is padded only to its own maximum, not a global one. The
//! same-different evaluator ranks all embedding pairs by cosine distance and
//! scores the ranking with average precision, split by word and speaker
//! identity. Everything else (the network itself, archive loading, the CLI)
//! lives behind seams.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod batching;
pub mod dataset;
pub mod error;
pub mod model;
pub mod samediff;
pub mod train;

// Convenience re-exports for downstream crates
pub use batching::{Batch, BatchingConfig, BucketIterator, SimpleIterator};
pub use dataset::{LabelInventory, LanguageInventory, WordDataset};
pub use error::VocableError;
pub use model::{ClassifierHandle, StubClassifier, StubClassifierConfig, WordClassifier};
pub use samediff::{SameDifferentReport, SwdpPrecision};
pub use train::{EpochRecord, TrainConfig};
