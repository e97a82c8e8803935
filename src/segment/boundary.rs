//! Boundary-classification model seam and score post-processing
//!
//! The model scores every token with "a paragraph boundary ends here".
//! Checkpoints disagree on output layout, so raw scores arrive as a closed
//! set of shapes that are normalized to one per-token probability array.

/// Raw per-token scores from a boundary-classification model
///
/// Shapes follow the exported model head: `[seq]`, `[batch, seq]`, or
/// `[batch, seq, classes]` with the boundary class at index 1. Batch size is
/// always 1 for segmentation.
#[derive(Debug, Clone)]
pub enum InferenceOutput {
    /// `[seq]` - one raw score per token
    Rank1(Vec<f32>),
    /// `[batch, seq]` - one raw score per token, batched
    Rank2(Vec<Vec<f32>>),
    /// `[batch, seq, classes]` - per-class logits, boundary class at index 1
    Rank3(Vec<Vec<Vec<f32>>>),
}

/// Class index carrying the "boundary" logit in rank-3 outputs
const BOUNDARY_CLASS: usize = 1;

/// Trait for boundary-classification models
///
/// Implementations hold the loaded model weights and must be callable
/// concurrently; each call owns its inputs and outputs.
pub trait BoundaryModel: Send + Sync {
    /// Score a token window for boundaries
    ///
    /// `input_ids` and `attention_mask` have identical lengths; the mask is
    /// all ones for segmentation windows (no padding).
    fn predict(&self, input_ids: &[i64], attention_mask: &[i64]) -> anyhow::Result<InferenceOutput>;
}

/// Numerically plain logistic sigmoid
pub fn sigmoid(score: f32) -> f32 {
    1.0 / (1.0 + (-score).exp())
}

/// Normalize any supported output shape to per-token boundary probabilities
pub fn boundary_probabilities(output: &InferenceOutput) -> Vec<f32> {
    match output {
        InferenceOutput::Rank1(scores) => scores.iter().map(|&s| sigmoid(s)).collect(),
        InferenceOutput::Rank2(batches) => batches
            .first()
            .map(|scores| scores.iter().map(|&s| sigmoid(s)).collect())
            .unwrap_or_default(),
        InferenceOutput::Rank3(batches) => batches
            .first()
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|classes| {
                        // A head without a boundary class scores as "never".
                        let score = classes
                            .get(BOUNDARY_CLASS)
                            .copied()
                            .unwrap_or(f32::NEG_INFINITY);
                        sigmoid(score)
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Token indices whose boundary probability meets the threshold
pub fn boundary_token_indices(probabilities: &[f32], threshold: f32) -> Vec<usize> {
    probabilities
        .iter()
        .enumerate()
        .filter(|(_, &p)| p >= threshold)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_rank1_probabilities() {
        let output = InferenceOutput::Rank1(vec![-10.0, 10.0, 0.0]);
        let probs = boundary_probabilities(&output);
        assert_eq!(probs.len(), 3);
        assert!(probs[0] < 0.01);
        assert!(probs[1] > 0.99);
        assert!((probs[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rank2_uses_first_batch() {
        let output = InferenceOutput::Rank2(vec![vec![10.0, -10.0], vec![-10.0, 10.0]]);
        let probs = boundary_probabilities(&output);
        assert_eq!(probs.len(), 2);
        assert!(probs[0] > 0.99);
        assert!(probs[1] < 0.01);
    }

    #[test]
    fn test_rank3_takes_boundary_class() {
        // Token 0: boundary logit low; token 1: boundary logit high.
        let output = InferenceOutput::Rank3(vec![vec![
            vec![5.0, -10.0],
            vec![-5.0, 10.0],
        ]]);
        let probs = boundary_probabilities(&output);
        assert!(probs[0] < 0.01);
        assert!(probs[1] > 0.99);
    }

    #[test]
    fn test_rank3_missing_class_is_never_boundary() {
        let output = InferenceOutput::Rank3(vec![vec![vec![3.0], vec![7.0]]]);
        let probs = boundary_probabilities(&output);
        assert!(probs.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let indices = boundary_token_indices(&[0.2, 0.5, 0.8], 0.5);
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_empty_batch_yields_no_probabilities() {
        assert!(boundary_probabilities(&InferenceOutput::Rank2(Vec::new())).is_empty());
        assert!(boundary_probabilities(&InferenceOutput::Rank3(Vec::new())).is_empty());
    }
}
