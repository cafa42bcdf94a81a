//! Document store abstraction.
//!
//! The [`DocumentStore`] trait covers the three operations the
//! pipeline needs — `search`, `index_document`, `count` — enabling
//! pluggable backends: the HTTP adapter for a remote search service in
//! production, and [`MemoryStore`] for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::embedding::cosine_similarity;
use crate::error::PipelineError;
use crate::query::{LexicalClause, RankingRequest};

/// A document body as written to and read from the store.
///
/// The vector is never all-zero: degenerate embeddings are excluded at
/// write time by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Logical source identifier shared by the chunks of one origin
    /// (resume, article). Deduplication operates at this granularity.
    pub source: String,
    /// Chunk text.
    pub content: String,
    /// Embedding vector in the index's space.
    pub vector: Vec<f32>,
    /// Publication date, if the collection is dated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_field: Option<NaiveDate>,
}

/// One ranked hit returned from a search.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub id: u64,
    pub document: StoreDocument,
    /// Combined score computed by the rescore script.
    pub score: f64,
}

/// Black-box document store exposing search, index, and count.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a composite ranking request, returning up to `size`
    /// hits ordered by combined score descending. Tie order is the
    /// store's native return order and is not re-sorted.
    async fn search(
        &self,
        index: &str,
        request: &RankingRequest,
        size: usize,
    ) -> Result<Vec<StoreHit>, PipelineError>;

    /// Write one document at an explicit id. Overwrites silently if
    /// the id already exists; id uniqueness is the caller's problem.
    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &StoreDocument,
    ) -> Result<(), PipelineError>;

    /// Number of documents currently in the index.
    async fn count(&self, index: &str) -> Result<u64, PipelineError>;
}

// ============ HTTP adapter ============

/// REST adapter for a remote search service with an Elasticsearch-style
/// API: `POST /{index}/_search`, `PUT /{index}/_doc/{id}`,
/// `GET /{index}/_count`.
pub struct HttpStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn search(
        &self,
        index: &str,
        request: &RankingRequest,
        size: usize,
    ) -> Result<Vec<StoreHit>, PipelineError> {
        let body = serde_json::json!({
            "query": request.to_wire(),
            "size": size,
        });

        let response = self
            .client
            .post(format!("{}/{}/_search", self.endpoint, index))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::RetrievalUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::RetrievalUnavailable(format!(
                "search API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::RetrievalUnavailable(e.to_string()))?;

        parse_search_response(&json)
    }

    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &StoreDocument,
    ) -> Result<(), PipelineError> {
        let response = self
            .client
            .put(format!("{}/{}/_doc/{}", self.endpoint, index, id))
            .json(document)
            .send()
            .await
            .map_err(|e| PipelineError::StoreWrite(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::StoreWrite(format!(
                "index API error {}: {}",
                status, body_text
            )));
        }
        Ok(())
    }

    async fn count(&self, index: &str) -> Result<u64, PipelineError> {
        let response = self
            .client
            .get(format!("{}/{}/_count", self.endpoint, index))
            .send()
            .await
            .map_err(|e| PipelineError::RetrievalUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::RetrievalUnavailable(format!(
                "count API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::RetrievalUnavailable(e.to_string()))?;

        json.get("count")
            .and_then(|c| c.as_u64())
            .ok_or_else(|| PipelineError::RetrievalUnavailable("missing count field".into()))
    }
}

/// Parse `hits.hits[]` from a search response: `_id`, `_score`,
/// `_source` document body.
fn parse_search_response(json: &serde_json::Value) -> Result<Vec<StoreHit>, PipelineError> {
    let hits = json
        .pointer("/hits/hits")
        .and_then(|h| h.as_array())
        .ok_or_else(|| PipelineError::RetrievalUnavailable("missing hits.hits".into()))?;

    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        let id = hit
            .get("_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u64>().ok())
            .or_else(|| hit.get("_id").and_then(|v| v.as_u64()))
            .unwrap_or(0);
        let score = hit.get("_score").and_then(|s| s.as_f64()).unwrap_or(0.0);
        let document: StoreDocument = serde_json::from_value(
            hit.get("_source")
                .cloned()
                .ok_or_else(|| PipelineError::RetrievalUnavailable("hit missing _source".into()))?,
        )
        .map_err(|e| PipelineError::RetrievalUnavailable(format!("malformed _source: {}", e)))?;

        out.push(StoreHit {
            id,
            document,
            score,
        });
    }
    Ok(out)
}

// ============ In-memory store ============

/// In-memory store for tests. Interprets the typed [`RankingRequest`]
/// directly: lexical scoring is boosted token overlap, the rescore is
/// the same `cosine + 1.0 + weight * lexical` formula the remote
/// script computes, and sorting is stable so tied scores keep
/// insertion order (store-native order).
pub struct MemoryStore {
    indexes: RwLock<HashMap<String, Vec<(u64, StoreDocument)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Boosted token-overlap score for one clause set against a document.
fn lexical_score(clauses: &[LexicalClause], content: &str) -> f64 {
    let content_lower = content.to_lowercase();
    let content_tokens: Vec<&str> = content_lower.split_whitespace().collect();

    let mut score = 0.0;
    for clause in clauses {
        match clause {
            LexicalClause::Fuzzy { query, boost }
            | LexicalClause::Alternate { query, boost } => {
                let matched = query
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|tok| content_tokens.contains(tok))
                    .count();
                score += boost * matched as f64;
            }
            LexicalClause::ExactTerm { value, boost } => {
                if content == value {
                    score += boost;
                }
            }
            LexicalClause::MatchAll { boost } => {
                score += boost;
            }
        }
    }
    score
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn search(
        &self,
        index: &str,
        request: &RankingRequest,
        size: usize,
    ) -> Result<Vec<StoreHit>, PipelineError> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| PipelineError::RetrievalUnavailable("store lock poisoned".into()))?;
        let docs = indexes.get(index).map(Vec::as_slice).unwrap_or(&[]);

        let mut hits: Vec<StoreHit> = docs
            .iter()
            .filter(|(_, doc)| match (&request.date_range, doc.date_field) {
                (Some(range), Some(date)) => range.contains(date),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|(id, doc)| {
                let cosine = cosine_similarity(&request.query_vector, &doc.vector) as f64 + 1.0;
                let lexical = lexical_score(&request.lexical, &doc.content);
                StoreHit {
                    id: *id,
                    document: doc.clone(),
                    score: cosine + request.lexical_weight * lexical,
                }
            })
            .collect();

        // Stable sort keeps insertion order for ties.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(size);
        Ok(hits)
    }

    async fn index_document(
        &self,
        index: &str,
        id: u64,
        document: &StoreDocument,
    ) -> Result<(), PipelineError> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| PipelineError::StoreWrite("store lock poisoned".into()))?;
        let docs = indexes.entry(index.to_string()).or_default();
        if let Some(slot) = docs.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = document.clone();
        } else {
            docs.push((id, document.clone()));
        }
        Ok(())
    }

    async fn count(&self, index: &str) -> Result<u64, PipelineError> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| PipelineError::RetrievalUnavailable("store lock poisoned".into()))?;
        Ok(indexes.get(index).map(|docs| docs.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, content: &str, vector: Vec<f32>) -> StoreDocument {
        StoreDocument {
            source: source.to_string(),
            content: content.to_string(),
            vector,
            date_field: None,
        }
    }

    fn request(query_vector: Vec<f32>, lexical_weight: f64) -> RankingRequest {
        RankingRequest {
            lexical: vec![LexicalClause::MatchAll { boost: 0.0 }],
            query_vector,
            lexical_weight,
            date_range: None,
        }
    }

    #[tokio::test]
    async fn test_vector_dominates_ranking() {
        let store = MemoryStore::new();
        store
            .index_document("idx", 0, &doc("a", "first", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .index_document("idx", 1, &doc("b", "second", vec![1.0, 1.0]))
            .await
            .unwrap();

        // cos(q, doc0) = 1.0 -> 2.0; cos(q, doc1) ~ 0.707 -> ~1.707
        let hits = store
            .search("idx", &request(vec![1.0, 0.0], 0.0), 10)
            .await
            .unwrap();
        assert_eq!(hits[0].id, 0);
        assert!((hits[0].score - 2.0).abs() < 1e-6);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_cosine_one_outranks_cosine_half() {
        let store = MemoryStore::new();
        store
            .index_document("idx", 0, &doc("a", "x", vec![2.0, 0.0]))
            .await
            .unwrap();
        // 60-degree vector: cosine 0.5 against the query.
        store
            .index_document("idx", 1, &doc("b", "y", vec![0.5, 0.75f32.sqrt()]))
            .await
            .unwrap();

        let hits = store
            .search("idx", &request(vec![1.0, 0.0], 0.0), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - 2.0).abs() < 1e-5);
        assert!((hits[1].score - 1.5).abs() < 1e-5);
        assert_eq!(hits[0].id, 0);
    }

    #[tokio::test]
    async fn test_degenerate_query_vector_degrades_to_lexical_order() {
        let store = MemoryStore::new();
        store
            .index_document("idx", 0, &doc("a", "rust systems", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .index_document("idx", 1, &doc("b", "cooking recipes", vec![0.0, 1.0]))
            .await
            .unwrap();

        let req = RankingRequest {
            lexical: vec![LexicalClause::Fuzzy {
                query: "rust".to_string(),
                boost: 1.0,
            }],
            query_vector: vec![0.0, 0.0],
            lexical_weight: 0.1,
            date_range: None,
        };
        let hits = store.search("idx", &req, 10).await.unwrap();
        // Vector term is a uniform +1.0; lexical signal decides.
        assert_eq!(hits[0].id, 0);
        assert!((hits[1].score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryStore::new();
        for id in 0..4 {
            store
                .index_document("idx", id, &doc("s", "same text", vec![1.0, 0.0]))
                .await
                .unwrap();
        }
        let hits = store
            .search("idx", &request(vec![1.0, 0.0], 0.0), 10)
            .await
            .unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_date_range_is_hard_filter() {
        let store = MemoryStore::new();
        let mut inside = doc("a", "x", vec![1.0, 0.0]);
        inside.date_field = NaiveDate::from_ymd_opt(2024, 9, 20);
        let mut outside = doc("b", "y", vec![1.0, 0.0]);
        outside.date_field = NaiveDate::from_ymd_opt(2024, 7, 1);
        let undated = doc("c", "z", vec![1.0, 0.0]);
        store.index_document("idx", 0, &inside).await.unwrap();
        store.index_document("idx", 1, &outside).await.unwrap();
        store.index_document("idx", 2, &undated).await.unwrap();

        let mut req = request(vec![1.0, 0.0], 0.0);
        req.date_range = Some(crate::query::DateRange::trailing(
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            30,
        ));
        let hits = store.search("idx", &req, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
    }

    #[tokio::test]
    async fn test_count_and_overwrite() {
        let store = MemoryStore::new();
        assert_eq!(store.count("idx").await.unwrap(), 0);
        store
            .index_document("idx", 0, &doc("a", "x", vec![1.0]))
            .await
            .unwrap();
        store
            .index_document("idx", 0, &doc("a", "replaced", vec![1.0]))
            .await
            .unwrap();
        assert_eq!(store.count("idx").await.unwrap(), 1);
    }

    #[test]
    fn test_parse_search_response_shapes() {
        let json = serde_json::json!({
            "hits": { "hits": [
                {
                    "_id": "7",
                    "_score": 1.9,
                    "_source": {
                        "source": "resume_a",
                        "content": "chunk text",
                        "vector": [0.1, 0.2]
                    }
                }
            ]}
        });
        let hits = parse_search_response(&json).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 7);
        assert_eq!(hits[0].document.source, "resume_a");
        assert!((hits[0].score - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_parse_search_response_missing_hits() {
        let json = serde_json::json!({"took": 3});
        assert!(parse_search_response(&json).is_err());
    }
}
