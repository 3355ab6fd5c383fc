//! Score normalization and fusion.
//!
//! The two stages emit scores on different scales (unbounded IDF sums
//! versus bounded cosine similarity), so each stage is min-max normalized
//! over the candidate set before the weighted blend.

use pantry_core::tool::RetrievedPassage;

const NON_FINITE_FALLBACK: f32 = 0.0;
const DEGENERATE_VALUE: f32 = 0.5;
const NUMERIC_EPSILON: f32 = 1e-10;

/// Stage weights for the blend. Equal weighting by default; kept
/// configurable because it is a tuning parameter, not a structural
/// invariant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            semantic: 0.5,
        }
    }
}

/// One candidate entering fusion, with raw per-stage scores. A candidate
/// absent from a stage carries 0.0 for that stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionCandidate {
    pub document_id: String,
    pub text: String,
    pub lexical_score: f32,
    pub semantic_score: f32,
}

/// In-place min-max normalization.
///
/// Finite values are scaled into `[0, 1]`. Non-finite values are mapped
/// to `0.0`. If all finite values are effectively identical, finite
/// values are mapped to `0.5`.
pub fn min_max_normalize(scores: &mut [f32]) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut saw_finite = false;

    for &value in scores.iter() {
        if value.is_finite() {
            min = min.min(value);
            max = max.max(value);
            saw_finite = true;
        }
    }

    if !saw_finite {
        scores.fill(NON_FINITE_FALLBACK);
        return;
    }

    let range = max - min;
    if range.abs() <= NUMERIC_EPSILON {
        for score in scores.iter_mut() {
            *score = if score.is_finite() {
                DEGENERATE_VALUE
            } else {
                NON_FINITE_FALLBACK
            };
        }
        return;
    }

    for score in scores.iter_mut() {
        if score.is_finite() {
            *score = ((*score - min) / range).clamp(0.0, 1.0);
        } else {
            *score = NON_FINITE_FALLBACK;
        }
    }
}

/// Normalizes both stages over the candidate set, blends, and ranks.
///
/// The returned passages are sorted by combined score descending, ties
/// broken by lexical score descending, then document id ascending, and
/// truncated to `top_k`. Callers must supply de-duplicated candidates
/// (one entry per document id).
pub fn fuse(
    candidates: Vec<FusionCandidate>,
    weights: FusionWeights,
    top_k: usize,
) -> Vec<RetrievedPassage> {
    let mut lexical: Vec<f32> = candidates.iter().map(|c| c.lexical_score).collect();
    let mut semantic: Vec<f32> = candidates.iter().map(|c| c.semantic_score).collect();
    min_max_normalize(&mut lexical);
    min_max_normalize(&mut semantic);

    let mut passages: Vec<RetrievedPassage> = candidates
        .into_iter()
        .zip(lexical.into_iter().zip(semantic))
        .map(|(candidate, (norm_lexical, norm_semantic))| RetrievedPassage {
            document_id: candidate.document_id,
            text: candidate.text,
            lexical_score: norm_lexical,
            semantic_score: norm_semantic,
            combined_score: weights.lexical * norm_lexical + weights.semantic * norm_semantic,
        })
        .collect();

    passages.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then(b.lexical_score.total_cmp(&a.lexical_score))
            .then(a.document_id.cmp(&b.document_id))
    });
    passages.truncate(top_k);
    passages
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn assert_approx_slice(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (idx, (lhs, rhs)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!(
                (*lhs - *rhs).abs() <= EPSILON,
                "index {idx}: {lhs} != {rhs} within {EPSILON}"
            );
        }
    }

    fn candidate(id: &str, lexical: f32, semantic: f32) -> FusionCandidate {
        FusionCandidate {
            document_id: id.to_string(),
            text: format!("text for {id}"),
            lexical_score: lexical,
            semantic_score: semantic,
        }
    }

    #[test]
    fn min_max_normalize_spans_unit_interval() {
        let mut scores = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        min_max_normalize(&mut scores);
        assert_approx_slice(&scores, &[0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn min_max_normalize_identical_values_to_midpoint() {
        let mut scores = vec![3.0, 3.0, 3.0];
        min_max_normalize(&mut scores);
        assert_approx_slice(&scores, &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn min_max_normalize_handles_non_finite_values() {
        let mut scores = vec![5.0, f32::NAN, f32::INFINITY, 10.0];
        min_max_normalize(&mut scores);
        assert_approx_slice(&scores, &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn combined_score_is_monotonic_in_each_component() {
        // Hold the candidate set's other scores fixed; raising one raw
        // component must not lower the candidate's combined score rank.
        let base = fuse(
            vec![
                candidate("a", 1.0, 0.2),
                candidate("b", 2.0, 0.4),
                candidate("c", 3.0, 0.6),
            ],
            FusionWeights::default(),
            10,
        );
        let raised = fuse(
            vec![
                candidate("a", 1.0, 0.2),
                candidate("b", 2.5, 0.4),
                candidate("c", 3.0, 0.6),
            ],
            FusionWeights::default(),
            10,
        );

        let combined = |set: &[RetrievedPassage], id: &str| {
            set.iter()
                .find(|p| p.document_id == id)
                .unwrap()
                .combined_score
        };
        assert!(combined(&raised, "b") >= combined(&base, "b"));
    }

    #[test]
    fn ranking_is_deterministic_with_tie_breaks() {
        let passages = fuse(
            vec![
                // b and a tie on combined; b has the higher lexical share.
                candidate("a", 0.0, 1.0),
                candidate("b", 1.0, 0.0),
                candidate("c", 0.5, 0.5),
            ],
            FusionWeights::default(),
            10,
        );
        let ids: Vec<&str> = passages.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn identical_candidates_tie_break_by_document_id() {
        let passages = fuse(
            vec![candidate("zeta", 1.0, 1.0), candidate("alpha", 1.0, 1.0)],
            FusionWeights::default(),
            10,
        );
        assert_eq!(passages[0].document_id, "alpha");
        assert_eq!(passages[1].document_id, "zeta");
    }

    #[test]
    fn top_k_truncates_after_ranking() {
        let passages = fuse(
            vec![
                candidate("a", 1.0, 1.0),
                candidate("b", 2.0, 2.0),
                candidate("c", 3.0, 3.0),
            ],
            FusionWeights::default(),
            2,
        );
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].document_id, "c");
    }

    #[test]
    fn custom_weights_shift_the_blend() {
        let lexical_heavy = FusionWeights {
            lexical: 0.9,
            semantic: 0.1,
        };
        let passages = fuse(
            vec![candidate("lex", 5.0, 0.0), candidate("sem", 0.0, 5.0)],
            lexical_heavy,
            10,
        );
        assert_eq!(passages[0].document_id, "lex");
    }
}
