//! Deterministic mock embedder for tests and offline fallback.

use async_trait::async_trait;

use crate::error::Result;
use crate::Embedder;

/// A mock embedder producing deterministic unit vectors.
///
/// The same text always yields the same embedding, so similarity search
/// and the record/query round trip can be exercised without a model on
/// disk. The vectors carry no semantic signal; tests that assert ranking
/// must seed their own geometry.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        // Same width as MiniLM-class sentence models.
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Seed a tiny LCG from the text hash so identical text gives
        // identical vectors.
        let mut state = djb2(text);
        let mut embedding = vec![0.0f32; self.dimensions];
        for slot in &mut embedding {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            *slot = ((state >> 16) as f32 / 32768.0) - 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn djb2(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedding_shape_and_norm() {
        let embedder = MockEmbedder::default();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.name(), "mock");

        let embedding = embedder.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 384);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = MockEmbedder::new(16);

        let e1 = embedder.embed("test text").await.unwrap();
        let e2 = embedder.embed("test text").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let embedder = MockEmbedder::new(16);

        let e1 = embedder.embed("hello").await.unwrap();
        let e2 = embedder.embed("world").await.unwrap();
        assert_ne!(e1, e2);
    }
}
