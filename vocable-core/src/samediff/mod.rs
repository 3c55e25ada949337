//! Same-different evaluation of acoustic word embeddings.
//!
//! ## Metric
//!
//! 1. Compute cosine distances between every unordered embedding pair
//!    (optionally after per-dimension standardization).
//! 2. Build boolean match arrays over the same canonical pair order: does a
//!    pair share a word label, does it share a speaker.
//! 3. Rank all pairs by ascending distance and score the ranking with
//!    average precision and precision at the same-different break-even
//!    point.
//! 4. Report two variants: unconditional (word match vs no word match) and
//!    speaker-discounted (same-word pairs split by speaker identity, each
//!    scored against the shared different-word pool).
//!
//! The speaker split exists because speaker identity is a confound: an
//! embedding that merely encodes the speaker would score well on
//! same-speaker word pairs. The different-speaker numbers isolate word
//! discriminability.

pub mod distance;

pub use distance::{cosine_pdist, num_pairs, standardize};

use ndarray::Array2;
use tracing::debug;

use crate::error::{Result, VocableError};

/// Boolean match indicator for every unordered pair, canonical pair order.
///
/// `result[p] == true` iff the two items of pair `p` compare equal. Pair `p`
/// enumerates (i, j) with i < j, row-major — the same order
/// [`cosine_pdist`] emits distances in.
pub fn generate_matches_array<T: PartialEq>(items: &[T]) -> Vec<bool> {
    let n = items.len();
    let mut matches = Vec::with_capacity(num_pairs(n));
    for i in 0..n {
        for j in (i + 1)..n {
            matches.push(items[i] == items[j]);
        }
    }
    matches
}

/// Average precision and precision-at-break-even for one same/different
/// split.
///
/// All pairs are ranked by ascending distance with a stable sort, so ties
/// keep their concatenation order (`same` before `different`) — identical
/// inputs always reproduce identical metrics. Walking the ranking, each
/// "same" item contributes its running precision to the AP mean; the
/// break-even precision is read off at the rank equal to the "same" count.
///
/// # Errors
/// `VocableError::EmptyGroup` if either group is empty — the metric is
/// undefined and a sentinel value would silently corrupt comparisons.
pub fn average_precision(same: &[f32], different: &[f32]) -> Result<(f64, f64)> {
    if same.is_empty() {
        return Err(VocableError::EmptyGroup { group: "same" });
    }
    if different.is_empty() {
        return Err(VocableError::EmptyGroup { group: "different" });
    }

    let n_same = same.len();
    let mut ranked: Vec<(f32, bool)> = same
        .iter()
        .map(|&d| (d, true))
        .chain(different.iter().map(|&d| (d, false)))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut matches_seen = 0usize;
    let mut precision_sum = 0.0f64;
    let mut break_even = 0.0f64;
    for (rank, &(_, is_same)) in ranked.iter().enumerate() {
        if is_same {
            matches_seen += 1;
            precision_sum += matches_seen as f64 / (rank + 1) as f64;
        }
        if rank + 1 == n_same {
            break_even = matches_seen as f64 / n_same as f64;
        }
    }

    Ok((precision_sum / n_same as f64, break_even))
}

/// Speaker-discounted precision scores.
///
/// Both same-word sub-groups are scored against the same different-word
/// pool; the `different_speaker_*` numbers are the headline metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwdpPrecision {
    pub same_speaker_ap: f64,
    pub same_speaker_prb: f64,
    pub different_speaker_ap: f64,
    pub different_speaker_prb: f64,
}

/// Score same-word pairs split by speaker identity against a shared
/// different-word pool.
///
/// # Errors
/// `VocableError::EmptyGroup` if any of the three groups is empty.
pub fn average_precision_swdp(
    same_speaker: &[f32],
    different_speaker: &[f32],
    different: &[f32],
) -> Result<SwdpPrecision> {
    if same_speaker.is_empty() {
        return Err(VocableError::EmptyGroup {
            group: "same-speaker same-word",
        });
    }
    if different_speaker.is_empty() {
        return Err(VocableError::EmptyGroup {
            group: "different-speaker same-word",
        });
    }
    let (same_speaker_ap, same_speaker_prb) = average_precision(same_speaker, different)?;
    let (different_speaker_ap, different_speaker_prb) =
        average_precision(different_speaker, different)?;
    Ok(SwdpPrecision {
        same_speaker_ap,
        same_speaker_prb,
        different_speaker_ap,
        different_speaker_prb,
    })
}

/// Full same-different evaluation of one embedding set.
#[derive(Debug, Clone, Copy)]
pub struct SameDifferentReport {
    /// Unconditional average precision (word match vs no word match).
    pub ap: f64,
    /// Unconditional precision at the break-even point.
    pub prb: f64,
    /// Speaker-discounted scores.
    pub swdp: SwdpPrecision,
}

impl SameDifferentReport {
    /// Evaluate embeddings against index-aligned word labels and speaker
    /// ids.
    ///
    /// Embedding row `i` must correspond to `labels[i]` and `speakers[i]` —
    /// i.e. the order the whole-set iterator emitted the examples in. With
    /// `standardize` set, distances are computed after per-dimension
    /// standardization over this embedding set.
    ///
    /// # Errors
    /// - `VocableError::AlignmentMismatch` if the metadata lengths differ
    ///   from the embedding count.
    /// - `VocableError::EmptyGroup` if any required pair group is empty
    ///   (fewer than two examples, no word matches, no same- or
    ///   different-speaker word matches, or no non-matches).
    pub fn evaluate<L: PartialEq, S: PartialEq>(
        embeddings: &Array2<f32>,
        labels: &[L],
        speakers: &[S],
        standardize_embeddings: bool,
    ) -> Result<Self> {
        let n = embeddings.nrows();
        if labels.len() != n {
            return Err(VocableError::AlignmentMismatch {
                what: "labels",
                got: labels.len(),
                expected: n,
            });
        }
        if speakers.len() != n {
            return Err(VocableError::AlignmentMismatch {
                what: "speakers",
                got: speakers.len(),
                expected: n,
            });
        }

        let distances = if standardize_embeddings {
            cosine_pdist(&standardize(embeddings))
        } else {
            cosine_pdist(embeddings)
        };
        let word_matches = generate_matches_array(labels);
        let speaker_matches = generate_matches_array(speakers);

        // Partition in canonical pair order so the concatenation-order
        // tie-break is identical for every variant.
        let mut same = Vec::new();
        let mut same_speaker = Vec::new();
        let mut different_speaker = Vec::new();
        let mut different = Vec::new();
        for (p, &d) in distances.iter().enumerate() {
            if word_matches[p] {
                same.push(d);
                if speaker_matches[p] {
                    same_speaker.push(d);
                } else {
                    different_speaker.push(d);
                }
            } else {
                different.push(d);
            }
        }
        debug!(
            pairs = distances.len(),
            same = same.len(),
            same_speaker = same_speaker.len(),
            different_speaker = different_speaker.len(),
            different = different.len(),
            "partitioned pair groups"
        );

        let (ap, prb) = average_precision(&same, &different)?;
        let swdp = average_precision_swdp(&same_speaker, &different_speaker, &different)?;
        Ok(Self { ap, prb, swdp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn matches_array_follows_canonical_pair_order() {
        let labels = ["a", "a", "b"];
        // Pairs (0,1), (0,2), (1,2)
        assert_eq!(generate_matches_array(&labels), vec![true, false, false]);
    }

    #[test]
    fn perfect_separation_scores_one() {
        let same = [0.1f32, 0.2, 0.3];
        let different = [0.5f32, 0.6, 0.7, 0.8];
        let (ap, prb) = average_precision(&same, &different).unwrap();
        assert_abs_diff_eq!(ap, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(prb, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn perfectly_interleaved_ranks_score_the_same_fraction() {
        // Ranking d, s, d, s: each same item sits at an even rank, so every
        // running precision is 1/2 — AP equals |same| / (|same| + |diff|).
        let same = [0.2f32, 0.4];
        let different = [0.1f32, 0.3];
        let (ap, prb) = average_precision(&same, &different).unwrap();
        assert_abs_diff_eq!(ap, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(prb, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn ties_break_by_concatenation_order() {
        // Equal distances: the stable sort keeps the same group (concatenated
        // first) ahead of the different group.
        let same = [0.5f32, 0.5];
        let different = [0.5f32, 0.5];
        let (ap, prb) = average_precision(&same, &different).unwrap();
        assert_abs_diff_eq!(ap, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(prb, 1.0, epsilon = 1e-12);
        // And the result is identical on repeat.
        let again = average_precision(&same, &different).unwrap();
        assert_eq!((ap, prb), again);
    }

    #[test]
    fn empty_groups_fail_loudly() {
        assert!(matches!(
            average_precision(&[], &[0.5]),
            Err(VocableError::EmptyGroup { group: "same" })
        ));
        assert!(matches!(
            average_precision(&[0.5], &[]),
            Err(VocableError::EmptyGroup {
                group: "different"
            })
        ));
    }

    #[test]
    fn swdp_scores_both_sub_groups_against_the_shared_pool() {
        let sw = [0.1f32, 0.3];
        let dw = [0.1f32, 0.3];
        let different = [0.2f32, 0.4];
        let scores = average_precision_swdp(&sw, &dw, &different).unwrap();
        // Identical sub-group distributions must score identically.
        assert_abs_diff_eq!(
            scores.same_speaker_ap,
            scores.different_speaker_ap,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            scores.same_speaker_prb,
            scores.different_speaker_prb,
            epsilon = 1e-12
        );
        // Ranking s(0.1), d(0.2), s(0.3), d(0.4): AP = (1 + 2/3) / 2.
        assert_abs_diff_eq!(scores.same_speaker_ap, 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn swdp_rejects_empty_sub_groups() {
        assert!(matches!(
            average_precision_swdp(&[], &[0.2], &[0.5]),
            Err(VocableError::EmptyGroup { .. })
        ));
        assert!(matches!(
            average_precision_swdp(&[0.2], &[], &[0.5]),
            Err(VocableError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn clustered_embeddings_reach_unconditional_ap_one() {
        // Two word clusters on orthogonal axes: all within-word distances 0,
        // all cross-word distances 1.
        let embeddings = array![
            [1.0f32, 0.0],
            [1.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.0, 1.0],
        ];
        let labels = ["a", "a", "a", "b", "b"];
        // Word "a" has a same-speaker pair (s1, s1) and different-speaker
        // pairs; "b" contributes a different-speaker pair.
        let speakers = ["s1", "s1", "s2", "s1", "s2"];
        let report = SameDifferentReport::evaluate(&embeddings, &labels, &speakers, false).unwrap();
        assert_abs_diff_eq!(report.ap, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.prb, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.swdp.same_speaker_ap, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.swdp.different_speaker_ap, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn unconditional_metric_for_two_word_clusters() {
        // Two tokens per word on orthogonal axes: within-word distance 0,
        // cross-word distance 1 — the unconditional ranking is perfect even
        // though every same-word pair crosses speakers.
        let embeddings = array![[1.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let distances = cosine_pdist(&embeddings);
        let word = generate_matches_array(&["a", "a", "b", "b"]);
        let same: Vec<f32> = distances
            .iter()
            .zip(&word)
            .filter(|(_, &m)| m)
            .map(|(&d, _)| d)
            .collect();
        let different: Vec<f32> = distances
            .iter()
            .zip(&word)
            .filter(|(_, &m)| !m)
            .map(|(&d, _)| d)
            .collect();
        assert_eq!(same.len(), 2);
        assert_eq!(different.len(), 4);
        let (ap, prb) = average_precision(&same, &different).unwrap();
        assert_abs_diff_eq!(ap, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(prb, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn evaluate_fails_without_same_speaker_word_pairs() {
        let embeddings = array![[1.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let labels = ["a", "a", "b", "b"];
        // Every same-word pair crosses speakers, so the same-speaker
        // sub-group is empty and the SWDP metric is undefined.
        let speakers = ["s1", "s2", "s1", "s2"];
        let err =
            SameDifferentReport::evaluate(&embeddings, &labels, &speakers, false).unwrap_err();
        assert!(matches!(err, VocableError::EmptyGroup { .. }));
    }

    #[test]
    fn evaluate_rejects_misaligned_metadata() {
        let embeddings = array![[1.0f32, 0.0], [0.0, 1.0]];
        let err = SameDifferentReport::evaluate(&embeddings, &["a"], &["s1", "s2"], false)
            .unwrap_err();
        assert!(matches!(
            err,
            VocableError::AlignmentMismatch { what: "labels", .. }
        ));
    }

    #[test]
    fn standardization_keeps_the_metric_defined_with_constant_dims() {
        // Second dimension is constant across the set — standardization must
        // not divide by zero, and the metric stays finite.
        let embeddings = array![
            [1.0f32, 7.0],
            [0.9, 7.0],
            [0.1, 7.0],
            [0.0, 7.0],
        ];
        let labels = ["a", "a", "b", "b"];
        // All four tokens share one speaker, so the full report would have an
        // empty different-speaker group — use the plain metric path.
        let distances = cosine_pdist(&standardize(&embeddings));
        assert!(distances.iter().all(|d| d.is_finite()));
        let word = generate_matches_array(&labels);
        let same: Vec<f32> = distances
            .iter()
            .zip(&word)
            .filter(|(_, &m)| m)
            .map(|(&d, _)| d)
            .collect();
        let different: Vec<f32> = distances
            .iter()
            .zip(&word)
            .filter(|(_, &m)| !m)
            .map(|(&d, _)| d)
            .collect();
        let (ap, _) = average_precision(&same, &different).unwrap();
        assert!(ap.is_finite());
    }
}
