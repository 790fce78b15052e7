//! Embedding providers.
//!
//! All chunks and queries go through the same `Embedder`, so index vectors
//! and query vectors always live in the same space. Two implementations:
//! - `HashingEmbedder`: deterministic local feature-hashing, no network.
//! - `OllamaEmbedder`: remote embedding endpoint, Ollama wire format.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::core::errors::RagError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per input, all the same length.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Deterministic bag-of-words feature hashing, L2-normalized.
///
/// Each token is hashed into one of `dimension` buckets with a sign bit, so
/// shared vocabulary between two texts produces positive cosine similarity
/// while disjoint texts stay orthogonal. Stateless and offline; the same text
/// always maps to the same vector.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(raw) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(inputs.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Remote embedding endpoint speaking the Ollama `/api/embeddings` format.
pub struct OllamaEmbedder {
    base_url: String,
    model_id: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model_id: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id,
            client,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut embeddings = Vec::with_capacity(inputs.len());

        for input in inputs {
            let body = json!({
                "model": self.model_id,
                "prompt": input,
            });

            let res = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(RagError::retrieval)?;

            if !res.status().is_success() {
                return Err(RagError::Retrieval(format!(
                    "embedding endpoint returned {}",
                    res.status()
                )));
            }

            let payload: Value = res.json().await.map_err(RagError::retrieval)?;
            let vector: Vec<f32> = payload["embedding"]
                .as_array()
                .ok_or_else(|| RagError::Retrieval("missing embedding field".to_string()))?
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();

            if vector.is_empty() {
                return Err(RagError::Retrieval("empty embedding returned".to_string()));
            }
            embeddings.push(vector);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let inputs = vec!["check my account balance".to_string()];

        let first = embedder.embed(&inputs).await.unwrap();
        let second = embedder.embed(&inputs).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), HashingEmbedder::DEFAULT_DIMENSION);
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashingEmbedder::default();
        let out = embedder
            .embed(&["savings account interest rates".to_string()])
            .await
            .unwrap();
        let norm: f32 = out[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_raises_similarity() {
        let embedder = HashingEmbedder::default();
        let out = embedder
            .embed(&[
                "how do i check my balance".to_string(),
                "your account balance can be checked in the app".to_string(),
                "the weather is sunny today".to_string(),
            ])
            .await
            .unwrap();

        let related = cosine(&out[0], &out[1]);
        let unrelated = cosine(&out[0], &out[2]);
        assert!(related > unrelated);
        assert!(related > 0.0);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::default();
        let out = embedder.embed(&["   ".to_string()]).await.unwrap();
        assert!(out[0].iter().all(|v| *v == 0.0));
    }
}
