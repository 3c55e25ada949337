//! Training options: one explicit struct, validated once.
//!
//! Every recognized option lives here with its default; nothing is merged
//! implicitly at call sites. The canonical JSON serialization of the struct
//! also names the experiment directory — identical options always land in
//! the same directory, any changed field lands in a new one.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Recognized training-set tags.
pub const TRAIN_TAGS: [&str; 3] = ["gt", "utd", "rnd"];

/// Hex characters of the options digest used in the directory name.
const HASH_LEN: usize = 10;

/// Fully-specified training run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainOptions {
    /// Training language codes (one or more, e.g. `["BG", "CH"]`).
    pub train_langs: Vec<String>,
    /// Held-out validation language, if any.
    pub val_lang: Option<String>,
    /// Which training set to use: "gt", "utd" or "rnd".
    pub train_tag: String,
    /// Maximum frames per sequence; longer sequences are truncated.
    pub max_length: usize,
    /// Leading feature coefficients kept per frame.
    pub frame_dim: usize,
    /// Embedding dimensionality produced by the encoder.
    pub embedding_dim: usize,
    pub n_epochs: usize,
    pub batch_size: usize,
    pub n_buckets: usize,
    /// Run validation every this many epochs.
    pub n_val_interval: usize,
    pub shuffle_every_epoch: bool,
    /// Use the final model (not the validation best) for the extrinsic
    /// evaluation.
    pub extrinsic_usefinal: bool,
    pub rnd_seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            train_langs: Vec::new(),
            val_lang: None,
            train_tag: "utd".into(),
            max_length: 100,
            frame_dim: 13,
            embedding_dim: 130,
            n_epochs: 10,
            batch_size: 300,
            n_buckets: 3,
            n_val_interval: 1,
            shuffle_every_epoch: true,
            extrinsic_usefinal: false,
            rnd_seed: 1,
        }
    }
}

impl TrainOptions {
    /// Reject nonsensical values up front — nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if self.train_langs.is_empty() {
            bail!("at least one training language is required");
        }
        if !TRAIN_TAGS.contains(&self.train_tag.as_str()) {
            bail!(
                "unknown train_tag {:?} (expected one of {:?})",
                self.train_tag,
                TRAIN_TAGS
            );
        }
        for (name, value) in [
            ("max_length", self.max_length),
            ("frame_dim", self.frame_dim),
            ("embedding_dim", self.embedding_dim),
            ("n_epochs", self.n_epochs),
            ("batch_size", self.batch_size),
            ("n_buckets", self.n_buckets),
            ("n_val_interval", self.n_val_interval),
        ] {
            if value == 0 {
                bail!("{name} must be ≥ 1");
            }
        }
        Ok(())
    }

    /// First `HASH_LEN` hex chars of the sha256 of the canonical options
    /// JSON.
    pub fn hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).context("serialize options")?;
        let digest = Sha256::digest(canonical.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Ok(hex[..HASH_LEN].to_string())
    }

    /// `<root>/<langs joined by '+'>.<tag>/<hash>`.
    pub fn experiment_dir(&self, root: &Path) -> Result<PathBuf> {
        let group = format!("{}.{}", self.train_langs.join("+"), self.train_tag);
        Ok(root.join(group).join(self.hash()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TrainOptions {
        TrainOptions {
            train_langs: vec!["BG".into(), "SP".into()],
            val_lang: Some("GE".into()),
            ..TrainOptions::default()
        }
    }

    #[test]
    fn default_with_languages_validates() {
        valid().validate().unwrap();
    }

    #[test]
    fn rejects_missing_languages_bad_tag_and_zeros() {
        assert!(TrainOptions::default().validate().is_err());

        let mut opts = valid();
        opts.train_tag = "bogus".into();
        assert!(opts.validate().is_err());

        let mut opts = valid();
        opts.batch_size = 0;
        assert!(opts.validate().is_err());

        let mut opts = valid();
        opts.n_buckets = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn hash_is_stable_and_field_sensitive() {
        let a = valid();
        let b = valid();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());

        let mut c = valid();
        c.rnd_seed = 2;
        assert_ne!(a.hash().unwrap(), c.hash().unwrap());
        assert_eq!(a.hash().unwrap().len(), 10);
    }

    #[test]
    fn experiment_dir_groups_by_languages_and_tag() {
        let opts = valid();
        let dir = opts.experiment_dir(Path::new("models")).unwrap();
        let mut parts = dir.iter();
        assert_eq!(parts.next().unwrap(), "models");
        assert_eq!(parts.next().unwrap(), "BG+SP.utd");
        assert_eq!(parts.next().unwrap(), opts.hash().unwrap().as_str());
    }
}
