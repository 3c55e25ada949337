//! JSON token-table loading.
//!
//! One file per language and split: `<data_dir>/<lang>/<split>.json`, a list
//! of token records with raw feature frames. Heavier archive formats and
//! token-count filtering belong to the feature-extraction side; this loader
//! only gets the tokens into memory with their metadata aligned.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::Deserialize;
use tracing::info;

/// One spoken word token as stored on disk.
#[derive(Debug, Deserialize)]
pub struct TokenRecord {
    pub key: String,
    pub label: String,
    pub speaker: String,
    /// Feature frames, one inner vector per frame.
    pub frames: Vec<Vec<f32>>,
}

/// Parallel per-token columns for one language file.
pub struct LanguageTokens {
    pub sequences: Vec<Array2<f32>>,
    pub labels: Vec<String>,
    pub keys: Vec<String>,
    pub speakers: Vec<String>,
}

/// Load `<data_dir>/<lang>/<split>.json`.
pub fn load_language(data_dir: &Path, lang: &str, split: &str) -> Result<LanguageTokens> {
    let path = data_dir.join(lang).join(format!("{split}.json"));
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("read token table {}", path.display()))?;
    let records: Vec<TokenRecord> =
        serde_json::from_str(&json).with_context(|| format!("parse {}", path.display()))?;

    let mut out = LanguageTokens {
        sequences: Vec::with_capacity(records.len()),
        labels: Vec::with_capacity(records.len()),
        keys: Vec::with_capacity(records.len()),
        speakers: Vec::with_capacity(records.len()),
    };
    for record in records {
        out.sequences.push(frames_to_array(&record)?);
        out.labels.push(record.label);
        out.keys.push(record.key);
        out.speakers.push(record.speaker);
    }
    info!(
        lang,
        split,
        n_tokens = out.sequences.len(),
        "loaded token table"
    );
    Ok(out)
}

fn frames_to_array(record: &TokenRecord) -> Result<Array2<f32>> {
    let n_frames = record.frames.len();
    let dim = record.frames.first().map_or(0, Vec::len);
    if let Some(bad) = record.frames.iter().find(|f| f.len() != dim) {
        bail!(
            "token {}: ragged frames ({} vs {} coefficients)",
            record.key,
            bad.len(),
            dim
        );
    }
    let flat: Vec<f32> = record.frames.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_frames, dim), flat)
        .with_context(|| format!("token {}: frame shape", record.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_become_a_row_major_array() {
        let record = TokenRecord {
            key: "k".into(),
            label: "w".into(),
            speaker: "s".into(),
            frames: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        };
        let a = frames_to_array(&record).unwrap();
        assert_eq!(a.shape(), &[3, 2]);
        assert_eq!(a[[1, 0]], 3.0);
        assert_eq!(a[[2, 1]], 6.0);
    }

    #[test]
    fn ragged_frames_are_rejected() {
        let record = TokenRecord {
            key: "k".into(),
            label: "w".into(),
            speaker: "s".into(),
            frames: vec![vec![1.0, 2.0], vec![3.0]],
        };
        assert!(frames_to_array(&record).is_err());
    }

    #[test]
    fn an_empty_token_is_a_zero_frame_array() {
        let record = TokenRecord {
            key: "k".into(),
            label: "w".into(),
            speaker: "s".into(),
            frames: vec![],
        };
        let a = frames_to_array(&record).unwrap();
        assert_eq!(a.shape(), &[0, 0]);
    }
}
