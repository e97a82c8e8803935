//! Pooling and normalization over per-token hidden states
//!
//! The local inference model emits one hidden vector per token; retrieval
//! needs a single fixed-length vector per passage.

/// Attention-mask-weighted mean over the sequence dimension
///
/// `hidden` is `[seq_len][hidden_size]`; positions with a zero mask (padding)
/// are excluded from both the sum and the count. An all-zero mask yields a
/// zero vector.
pub fn masked_mean_pool(hidden: &[Vec<f32>], attention_mask: &[i64]) -> Vec<f32> {
    let hidden_size = hidden.first().map(|h| h.len()).unwrap_or(0);
    let mut pooled = vec![0.0f32; hidden_size];
    let mut count = 0usize;

    for (token, &mask) in hidden.iter().zip(attention_mask.iter()) {
        if mask == 0 {
            continue;
        }
        for (acc, &value) in pooled.iter_mut().zip(token.iter()) {
            *acc += value;
        }
        count += 1;
    }

    if count > 0 {
        let inv = 1.0 / count as f32;
        for value in &mut pooled {
            *value *= inv;
        }
    }

    pooled
}

/// Scale a vector to unit L2 norm; a zero vector is left unchanged
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_mean_pool_averages_unmasked_tokens() {
        let hidden = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let pooled = masked_mean_pool(&hidden, &[1, 1]);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let hidden = vec![vec![1.0, 2.0], vec![100.0, 100.0]];
        let pooled = masked_mean_pool(&hidden, &[1, 0]);
        assert_eq!(pooled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let hidden = vec![vec![1.0, 2.0]];
        let pooled = masked_mean_pool(&hidden, &[0]);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((norm(&v) - 1.0).abs() < 1e-4);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
