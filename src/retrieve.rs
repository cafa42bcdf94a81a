//! Retrieval over a [`DocumentStore`]: ranked hits and group-level
//! deduplication.
//!
//! Hit ordering is strictly combined-score descending with store-native
//! tie order; across repeated calls tie order may legitimately differ
//! if the store's native scoring is not deterministic for ties, and
//! that is accepted rather than corrected here.

use tracing::debug;

use crate::error::PipelineError;
use crate::query::RankingRequest;
use crate::store::DocumentStore;

/// One ranked retrieval result.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub id: u64,
    /// Logical source identifier (group key) this chunk belongs to.
    pub group_key: String,
    pub content: String,
    /// Combined score: shifted cosine plus down-weighted lexical.
    pub score: f64,
}

/// Deduplicated view answering "which sources are relevant" rather
/// than "which chunks": one entry per distinct group key, carrying the
/// first (best-ranked) score seen for that key.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub group_key: String,
    pub score: f64,
}

/// Execute a ranking request, returning up to `top_k` hits ordered by
/// combined score descending.
///
/// Store failures surface as [`PipelineError::RetrievalUnavailable`];
/// there is no local retry — retry policy belongs to the operator.
pub async fn retrieve(
    store: &dyn DocumentStore,
    index: &str,
    request: &RankingRequest,
    top_k: usize,
) -> Result<Vec<RetrievalHit>, PipelineError> {
    let hits = store.search(index, request, top_k).await?;
    debug!(index, hits = hits.len(), "retrieval complete");

    Ok(hits
        .into_iter()
        .map(|hit| RetrievalHit {
            id: hit.id,
            group_key: hit.document.source,
            content: hit.document.content,
            score: hit.score,
        })
        .collect())
}

/// Collapse ranked hits to one [`ScoreEntry`] per distinct group key,
/// preserving first-seen order and dropping later duplicates.
pub fn dedupe_by_group(hits: &[RetrievalHit]) -> Vec<ScoreEntry> {
    let mut entries: Vec<ScoreEntry> = Vec::new();
    for hit in hits {
        if !entries.iter().any(|e| e.group_key == hit.group_key) {
            entries.push(ScoreEntry {
                group_key: hit.group_key.clone(),
                score: hit.score,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: u64, group: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            id,
            group_key: group.to_string(),
            content: String::new(),
            score,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let hits = vec![
            hit(0, "resume_b", 1.9),
            hit(1, "resume_a", 1.8),
            hit(2, "resume_b", 1.7),
            hit(3, "resume_c", 1.6),
            hit(4, "resume_a", 1.5),
        ];
        let entries = dedupe_by_group(&hits);
        let keys: Vec<&str> = entries.iter().map(|e| e.group_key.as_str()).collect();
        assert_eq!(keys, vec!["resume_b", "resume_a", "resume_c"]);
    }

    #[test]
    fn test_dedupe_carries_first_score() {
        let hits = vec![hit(0, "a", 1.9), hit(1, "a", 1.2)];
        let entries = dedupe_by_group(&hits);
        assert_eq!(entries.len(), 1);
        assert!((entries[0].score - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_dedupe_one_entry_per_distinct_key() {
        let hits = vec![
            hit(0, "a", 2.0),
            hit(1, "b", 1.9),
            hit(2, "a", 1.8),
            hit(3, "b", 1.7),
        ];
        let entries = dedupe_by_group(&hits);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe_by_group(&[]).is_empty());
    }
}
