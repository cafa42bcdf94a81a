//! Embedding service adapter and typed vector spaces.
//!
//! Defines the [`Embedder`] trait implemented by embedding backends,
//! an HTTP adapter for OpenAI-style embedding endpoints, and the
//! marker types that keep the two embedding spaces apart at compile
//! time: resume/content chunks and question material are embedded by
//! different models with different dimensionalities, and a vector from
//! one space must never be stored in or compared against the other.
//!
//! There is no retry here. A failing embed call is fatal for the
//! enclosing operation — no partial document is written and no query
//! is issued with a missing vector.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EmbeddingSpaceConfig;
use crate::error::PipelineError;

/// A black-box embedding backend: deterministic for a given
/// model+input, returning a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"bert-base"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

/// True iff every component of `v` is exactly zero.
///
/// A zero vector collapses cosine similarity to a constant and would
/// corrupt ranking; callers must discard degenerate embeddings rather
/// than index or search with them.
pub fn is_degenerate(v: &[f32]) -> bool {
    v.iter().all(|&x| x == 0.0)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or
/// degenerate (zero-magnitude) inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

// ============ Typed vector spaces ============

/// Marker for an embedding space. Implemented by uninhabited types so
/// a space is purely a compile-time label.
pub trait VectorSpace: Send + Sync + 'static {
    /// Human-readable space name, used in logs and error messages.
    const NAME: &'static str;
}

/// Embedding space of the resume/content collection.
pub enum ContentSpace {}

/// Embedding space of the question collection.
pub enum QuestionSpace {}

impl VectorSpace for ContentSpace {
    const NAME: &'static str = "content";
}

impl VectorSpace for QuestionSpace {
    const NAME: &'static str = "question";
}

/// A vector tagged with the space it was embedded in. Two embeddings
/// from different spaces are different types and cannot be compared or
/// stored interchangeably.
#[derive(Debug, Clone)]
pub struct Embedding<S: VectorSpace> {
    values: Vec<f32>,
    _space: PhantomData<S>,
}

impl<S: VectorSpace> Embedding<S> {
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self {
            values,
            _space: PhantomData,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn is_degenerate(&self) -> bool {
        is_degenerate(&self.values)
    }

    pub fn into_raw(self) -> Vec<f32> {
        self.values
    }
}

/// An [`Embedder`] bound to one vector space. The only way to obtain
/// an [`Embedding<S>`] is through the embedder for that space.
pub struct SpaceEmbedder<S: VectorSpace> {
    inner: Arc<dyn Embedder>,
    _space: PhantomData<S>,
}

impl<S: VectorSpace> SpaceEmbedder<S> {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self {
            inner,
            _space: PhantomData,
        }
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    pub fn dims(&self) -> usize {
        self.inner.dims()
    }

    pub async fn embed(&self, text: &str) -> Result<Embedding<S>, PipelineError> {
        let values = self.inner.embed(text).await?;
        if values.len() != self.inner.dims() {
            return Err(PipelineError::Embedding(format!(
                "{} space: expected {} dims, got {}",
                S::NAME,
                self.inner.dims(),
                values.len()
            )));
        }
        Ok(Embedding::from_raw(values))
    }
}

// ============ HTTP adapter ============

/// Embedding provider over an OpenAI-style `POST /embeddings` API.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    dims: usize,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Create an adapter from configuration. Resolves the API key from
    /// the environment at construction so a missing credential fails at
    /// startup, not mid-request.
    pub fn new(config: &EmbeddingSpaceConfig) -> Result<Self, PipelineError> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                PipelineError::Configuration(format!("{} environment variable not set", var))
            })?),
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut req = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!(
                "embedding API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        parse_embedding_response(&json)
    }
}

/// Extract the first `data[].embedding` array from an OpenAI-style
/// embeddings response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            PipelineError::Embedding("invalid embedding response: missing data[0].embedding".into())
        })?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| PipelineError::Embedding("non-numeric embedding component".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_iff_all_zero() {
        assert!(is_degenerate(&[0.0, 0.0, 0.0]));
        assert!(is_degenerate(&[]));
        assert!(!is_degenerate(&[0.0, 1e-30, 0.0]));
        assert!(!is_degenerate(&[-0.5, 0.0]));
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_input_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 2.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_parse_embedding_response() {
        let json = serde_json::json!({
            "data": [{"embedding": [0.25, -1.5, 2.0]}]
        });
        let v = parse_embedding_response(&json).unwrap();
        assert_eq!(v, vec![0.25, -1.5, 2.0]);
    }

    #[test]
    fn test_parse_embedding_response_missing_data() {
        let json = serde_json::json!({"unexpected": true});
        assert!(parse_embedding_response(&json).is_err());
    }
}
