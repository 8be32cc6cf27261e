//! Local embeddings using ONNX Runtime.
//!
//! This module requires the `local-embeddings` feature to be enabled.

use std::path::Path;

use async_trait::async_trait;
use ndarray::Array2;
use ort::{GraphOptimizationLevel, Session};
use tokenizers::Tokenizer;

use crate::error::{EmbedError, Result};
use crate::Embedder;

/// Local embedder running a sentence-transformer ONNX model.
///
/// Inference is entirely offline: tokenize, run the transformer, mean-pool
/// over the attention mask, L2-normalize.
pub struct LocalEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    dimensions: usize,
}

impl LocalEmbedder {
    /// Load a local embedder from model files.
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to the tokenizer.json file
    /// * `dimensions` - Output embedding dimensions
    pub fn load(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        dimensions: usize,
    ) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| EmbedError::Inference(format!("Failed to create ONNX session: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EmbedError::Inference(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path.as_ref())
            .map_err(|e| {
                EmbedError::Inference(format!(
                    "Failed to load ONNX model from {:?}: {}",
                    model_path.as_ref(),
                    e
                ))
            })?;

        let tokenizer = Tokenizer::from_file(tokenizer_path.as_ref()).map_err(|e| {
            EmbedError::Inference(format!(
                "Failed to load tokenizer from {:?}: {}",
                tokenizer_path.as_ref(),
                e
            ))
        })?;

        Ok(Self {
            session,
            tokenizer,
            dimensions,
        })
    }

    fn run_inference(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {}", e)))?;

        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        let types = encoding.get_type_ids();
        let seq_len = ids.len();

        let to_array = |values: &[u32]| -> Result<Array2<i64>> {
            Array2::from_shape_vec((1, seq_len), values.iter().map(|&v| v as i64).collect())
                .map_err(|e| EmbedError::Inference(format!("Array error: {}", e)))
        };

        let input_ids = to_array(ids)?;
        let attention_mask = to_array(mask)?;
        let token_type_ids = to_array(types)?;

        let outputs = self
            .session
            .run(
                ort::inputs![
                    "input_ids" => input_ids.view(),
                    "attention_mask" => attention_mask.view(),
                    "token_type_ids" => token_type_ids.view(),
                ]
                .map_err(|e| EmbedError::Inference(format!("Input error: {}", e)))?,
            )
            .map_err(|e| EmbedError::Inference(format!("ONNX inference failed: {}", e)))?;

        let hidden = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedError::Inference(format!("Output extraction failed: {}", e)))?;

        // shape is (1, seq_len, hidden_dim); mean-pool over the unmasked
        // positions, then L2-normalize.
        let hidden = hidden.view().to_owned();
        let hidden_dim = hidden.shape()[2];

        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (j, &mask_val) in mask.iter().enumerate() {
            if mask_val > 0 {
                for k in 0..hidden_dim {
                    pooled[k] += hidden[[0, j, k]];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for v in &mut pooled {
                *v /= count;
            }
        }

        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-9 {
            for v in &mut pooled {
                *v /= norm;
            }
        }

        Ok(pooled)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run_inference(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "local"
    }
}
