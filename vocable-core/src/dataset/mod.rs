//! In-memory word token collection with index-aligned metadata.
//!
//! Every per-example attribute (sequence, label, key, speaker, language) lives
//! in its own parallel vector, indexed by position. That alignment is the
//! central invariant of the whole pipeline: iterators and the evaluator hand
//! indices back and forth, so any reordering must touch all vectors at once.
//! Constructors reject misaligned inputs instead of truncating.
//!
//! Archive loading and token-count filtering are upstream collaborators; this
//! module starts where they end, with sequences already in memory.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{s, Array2};
use tracing::debug;

use crate::error::{Result, VocableError};

/// An ordered collection of spoken word tokens.
///
/// Each token is a variable-length sequence of fixed-dimension feature frames
/// plus its word label, a unique key, a speaker id, and a language code.
#[derive(Debug, Clone)]
pub struct WordDataset {
    sequences: Vec<Array2<f32>>,
    labels: Vec<String>,
    keys: Vec<String>,
    speakers: Vec<String>,
    languages: Vec<String>,
}

impl WordDataset {
    /// Create a dataset from parallel per-token vectors.
    ///
    /// # Errors
    /// - `VocableError::AlignmentMismatch` if any metadata vector's length
    ///   differs from the sequence count.
    /// - `VocableError::InvalidConfig` if sequences disagree on feature
    ///   dimensionality.
    pub fn new(
        sequences: Vec<Array2<f32>>,
        labels: Vec<String>,
        keys: Vec<String>,
        speakers: Vec<String>,
        languages: Vec<String>,
    ) -> Result<Self> {
        let n = sequences.len();
        for (what, got) in [
            ("labels", labels.len()),
            ("keys", keys.len()),
            ("speakers", speakers.len()),
            ("languages", languages.len()),
        ] {
            if got != n {
                return Err(VocableError::AlignmentMismatch {
                    what,
                    got,
                    expected: n,
                });
            }
        }

        if let Some(first) = sequences.first() {
            let dim = first.ncols();
            if let Some(bad) = sequences.iter().find(|s| s.ncols() != dim) {
                return Err(VocableError::InvalidConfig(format!(
                    "feature dimensionality mismatch: expected {dim}, found {}",
                    bad.ncols()
                )));
            }
        }

        Ok(Self {
            sequences,
            labels,
            keys,
            speakers,
            languages,
        })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Feature dimensionality, or 0 for an empty dataset.
    pub fn feature_dim(&self) -> usize {
        self.sequences.first().map_or(0, |s| s.ncols())
    }

    /// Frame count of every sequence, index-aligned.
    pub fn lengths(&self) -> Vec<usize> {
        self.sequences.iter().map(|s| s.nrows()).collect()
    }

    pub fn sequences(&self) -> &[Array2<f32>] {
        &self.sequences
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Clamp every sequence to at most `max_length` frames and the first
    /// `max_dim` feature coefficients.
    ///
    /// Sequences already within the limits are left untouched. Metadata
    /// alignment is unaffected — only frame content shrinks.
    pub fn truncate_and_limit_dim(&mut self, max_length: usize, max_dim: usize) {
        let mut truncated = 0usize;
        for seq in &mut self.sequences {
            let len = seq.nrows().min(max_length);
            let dim = seq.ncols().min(max_dim);
            if len != seq.nrows() || dim != seq.ncols() {
                *seq = seq.slice(s![..len, ..dim]).to_owned();
                truncated += 1;
            }
        }
        debug!(
            max_length,
            max_dim, truncated, "truncated sequences to limits"
        );
    }

    /// Map language codes to dense integer ids, sorted by code.
    ///
    /// Sorting makes the assignment deterministic across runs regardless of
    /// token order, so class maps stay comparable between experiments.
    pub fn intern_languages(&self) -> LanguageInventory {
        let codes: Vec<String> = self
            .languages
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        let ids = self
            .languages
            .iter()
            .map(|c| codes.binary_search(c).expect("code interned") as u32)
            .collect();
        LanguageInventory { codes, ids }
    }

    /// Map word labels to per-language class ids, sorted within each language.
    ///
    /// A label string is a distinct class in every language it occurs in —
    /// class ids are only meaningful relative to a language's own output head.
    pub fn intern_labels(&self, langs: &LanguageInventory) -> LabelInventory {
        let n_languages = langs.n_languages();
        let mut per_language: Vec<BTreeMap<String, u32>> = vec![BTreeMap::new(); n_languages];
        for (label, &lang_id) in self.labels.iter().zip(langs.ids()) {
            per_language[lang_id as usize].insert(label.clone(), 0);
        }
        let mut classes = Vec::with_capacity(n_languages);
        for lang_map in &mut per_language {
            for (class_id, (_, slot)) in lang_map.iter_mut().enumerate() {
                *slot = class_id as u32;
            }
            classes.push(lang_map.keys().cloned().collect::<Vec<_>>());
        }
        let class_ids = self
            .labels
            .iter()
            .zip(langs.ids())
            .map(|(label, &lang_id)| per_language[lang_id as usize][label])
            .collect();
        LabelInventory { class_ids, classes }
    }
}

/// Deterministic language-code interning produced by
/// [`WordDataset::intern_languages`].
#[derive(Debug, Clone)]
pub struct LanguageInventory {
    /// Language codes in id order (sorted).
    codes: Vec<String>,
    /// Dense language id per example, index-aligned with the dataset.
    ids: Vec<u32>,
}

impl LanguageInventory {
    pub fn n_languages(&self) -> usize {
        self.codes.len()
    }

    pub fn code(&self, id: u32) -> Option<&str> {
        self.codes.get(id as usize).map(String::as_str)
    }

    pub fn id_of(&self, code: &str) -> Option<u32> {
        self.codes
            .binary_search_by(|c| c.as_str().cmp(code))
            .ok()
            .map(|i| i as u32)
    }

    /// Dense language id per example, index-aligned with the dataset.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }
}

/// Per-language class interning produced by [`WordDataset::intern_labels`].
#[derive(Debug, Clone)]
pub struct LabelInventory {
    /// Class id per example, within the example's own language.
    class_ids: Vec<u32>,
    /// Sorted label set per language id.
    classes: Vec<Vec<String>>,
}

impl LabelInventory {
    /// Class id per example, index-aligned with the dataset.
    pub fn class_ids(&self) -> &[u32] {
        &self.class_ids
    }

    /// Number of word classes for each language id.
    pub fn n_classes(&self) -> Vec<usize> {
        self.classes.iter().map(Vec::len).collect()
    }

    pub fn label(&self, language_id: u32, class_id: u32) -> Option<&str> {
        self.classes
            .get(language_id as usize)?
            .get(class_id as usize)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn seq(len: usize, dim: usize, fill: f32) -> Array2<f32> {
        Array2::from_elem((len, dim), fill)
    }

    fn dataset() -> WordDataset {
        WordDataset::new(
            vec![seq(4, 3, 0.1), seq(7, 3, 0.2), seq(2, 3, 0.3)],
            vec!["water".into(), "fire".into(), "water".into()],
            vec!["k1".into(), "k2".into(), "k3".into()],
            vec!["s1".into(), "s2".into(), "s1".into()],
            vec!["SP".into(), "BG".into(), "SP".into()],
        )
        .unwrap()
    }

    #[test]
    fn rejects_misaligned_metadata() {
        let err = WordDataset::new(
            vec![seq(4, 3, 0.0)],
            vec!["a".into(), "b".into()],
            vec!["k1".into()],
            vec!["s1".into()],
            vec!["SP".into()],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VocableError::AlignmentMismatch { what: "labels", .. }
        ));
    }

    #[test]
    fn rejects_mixed_feature_dims() {
        let err = WordDataset::new(
            vec![seq(4, 3, 0.0), seq(4, 5, 0.0)],
            vec!["a".into(), "b".into()],
            vec!["k1".into(), "k2".into()],
            vec!["s1".into(), "s2".into()],
            vec!["SP".into(), "SP".into()],
        )
        .unwrap_err();
        assert!(matches!(err, VocableError::InvalidConfig(_)));
    }

    #[test]
    fn truncation_clamps_length_and_dim() {
        let mut ds = dataset();
        ds.truncate_and_limit_dim(3, 2);
        assert_eq!(ds.lengths(), vec![3, 3, 2]);
        assert_eq!(ds.feature_dim(), 2);
        // Metadata untouched
        assert_eq!(ds.labels().len(), 3);
    }

    #[test]
    fn truncation_is_a_noop_within_limits() {
        let mut ds = dataset();
        ds.truncate_and_limit_dim(100, 13);
        assert_eq!(ds.lengths(), vec![4, 7, 2]);
        assert_eq!(ds.feature_dim(), 3);
    }

    #[test]
    fn language_ids_follow_sorted_codes() {
        let ds = dataset();
        let langs = ds.intern_languages();
        // "BG" < "SP" in sorted order
        assert_eq!(langs.n_languages(), 2);
        assert_eq!(langs.code(0), Some("BG"));
        assert_eq!(langs.code(1), Some("SP"));
        assert_eq!(langs.ids(), &[1, 0, 1]);
        assert_eq!(langs.id_of("SP"), Some(1));
        assert_eq!(langs.id_of("XX"), None);
    }

    #[test]
    fn class_ids_are_per_language_and_sorted() {
        let ds = dataset();
        let langs = ds.intern_languages();
        let labels = ds.intern_labels(&langs);
        // SP has {"water"} → class 0; BG has {"fire"} → class 0.
        assert_eq!(labels.class_ids(), &[0, 0, 0]);
        assert_eq!(labels.n_classes(), vec![1, 1]);
        assert_eq!(labels.label(1, 0), Some("water"));
        assert_eq!(labels.label(0, 0), Some("fire"));
    }
}
