//! Simulated embeddings for testing and offline use
//!
//! Deterministic: the same text always maps to the same unit vector, and
//! texts sharing words land near each other. No model, no network.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::pooling::l2_normalize;

/// Deterministic hash-bucket embedding provider
pub struct SimulatedEmbedding {
    dimensions: usize,
}

impl SimulatedEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Get dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings
    pub fn embed(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = FxHasher::default();
            word.hash(&mut hasher);
            let h = hasher.finish();

            let bucket = (h as usize) % self.dimensions;
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic() {
        let provider = SimulatedEmbedding::new(64);
        let a = provider.embed(&["storage engines are fun"]);
        let b = provider.embed(&["storage engines are fun"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unit_norm() {
        let provider = SimulatedEmbedding::new(64);
        let v = &provider.embed(&["hello world"])[0];
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_overlap_scores_higher() {
        let provider = SimulatedEmbedding::new(256);
        let vectors = provider.embed(&[
            "vector search with cosine similarity",
            "vector search with cosine distance",
            "completely unrelated gardening tips",
        ]);
        let same = dot(&vectors[0], &vectors[1]);
        let different = dot(&vectors[0], &vectors[2]);
        assert!(same > different);
    }
}
