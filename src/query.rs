//! Hybrid ranking request construction.
//!
//! A [`RankingRequest`] combines a disjunctive set of lexical clauses
//! with a script-style rescore that adds shifted cosine similarity to
//! a down-weighted lexical base score:
//!
//! ```text
//! combined = cosineSimilarity(query_vector, doc.vector) + 1.0
//!          + lexical_weight * lexical_score
//! ```
//!
//! The vector term dominates ranking; the lexical signal breaks
//! near-ties. The rescore runs over the full candidate set, never as a
//! pre-filter, and the catch-all clause keeps every document scoreable.
//! If the query embedding is degenerate the cosine term contributes a
//! uniform `+1.0` and ordering degrades gracefully to lexical-only.
//!
//! Requests are built typed and rendered to the store's JSON DSL by
//! [`RankingRequest::to_wire`]; the in-memory store interprets the
//! typed form directly.

use chrono::NaiveDate;
use serde_json::json;

use crate::config::RetrievalConfig;
use crate::embedding::{Embedding, VectorSpace};

/// Retrieval mode for question generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Rank by the query text alone.
    Default,
    /// Additionally fan the query out across a trailing window of
    /// calendar dates, so dated content is discoverable even when the
    /// query text itself carries no date.
    TimeSensitive,
}

/// One lexical clause in the disjunction.
#[derive(Debug, Clone)]
pub enum LexicalClause {
    /// Tokenized fuzzy match against the content field.
    Fuzzy { query: String, boost: f64 },
    /// Exact term match on the unanalyzed subfield. Boosted above the
    /// fuzzy clause: an exact hit is stronger signal.
    ExactTerm { value: String, boost: f64 },
    /// Match through the alternate analyzer subfield.
    Alternate { query: String, boost: f64 },
    /// Catch-all with near-zero boost; scoring floor, never a filter.
    MatchAll { boost: f64 },
}

/// Inclusive `[start, end]` hard filter on the document date field.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The trailing `days`-wide window ending at `today`, inclusive.
    pub fn trailing(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - chrono::Duration::days(days),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A composite ranking request: lexical disjunction, vector rescore,
/// optional hard date filter.
#[derive(Debug, Clone)]
pub struct RankingRequest {
    pub lexical: Vec<LexicalClause>,
    pub query_vector: Vec<f32>,
    pub lexical_weight: f64,
    pub date_range: Option<DateRange>,
}

impl RankingRequest {
    /// Render the request as the document store's JSON query DSL.
    pub fn to_wire(&self) -> serde_json::Value {
        let should: Vec<serde_json::Value> = self
            .lexical
            .iter()
            .map(|clause| match clause {
                LexicalClause::Fuzzy { query, boost } => json!({
                    "match": {
                        "content": {
                            "query": query,
                            "fuzziness": "AUTO",
                            "boost": boost,
                        }
                    }
                }),
                LexicalClause::ExactTerm { value, boost } => json!({
                    "term": {
                        "content.keyword": {
                            "value": value,
                            "boost": boost,
                        }
                    }
                }),
                LexicalClause::Alternate { query, boost } => json!({
                    "match": {
                        "content.mixed": {
                            "query": query,
                            "boost": boost,
                        }
                    }
                }),
                LexicalClause::MatchAll { boost } => json!({
                    "match_all": { "boost": boost }
                }),
            })
            .collect();

        let scored = json!({
            "script_score": {
                "query": { "bool": { "should": should } },
                "script": {
                    "source": "double cosine_score = cosineSimilarity(params.query_vector, 'vector') + 1.0; \
                               double text_score = _score * params.lexical_weight; \
                               return cosine_score + text_score;",
                    "params": {
                        "query_vector": self.query_vector,
                        "lexical_weight": self.lexical_weight,
                    }
                }
            }
        });

        match &self.date_range {
            Some(range) => json!({
                "bool": {
                    "must": [
                        {
                            "range": {
                                "date_field": {
                                    "gte": range.start.format("%Y-%m-%d").to_string(),
                                    "lte": range.end.format("%Y-%m-%d").to_string(),
                                }
                            }
                        },
                        scored,
                    ]
                }
            }),
            None => scored,
        }
    }
}

/// Date strings for `today` back through `today - days`, newest first,
/// formatted `%Y.%m.%d` to match how dated content is written.
pub fn dates_within_days(today: NaiveDate, days: i64) -> Vec<String> {
    (0..=days)
        .map(|i| (today - chrono::Duration::days(i)).format("%Y.%m.%d").to_string())
        .collect()
}

/// Builds [`RankingRequest`]s for one vector space. The space parameter
/// ties the accepted query embedding to the index this builder serves;
/// a content-space embedding cannot be used to build a question-space
/// request.
pub struct HybridQueryBuilder<'a, S: VectorSpace> {
    params: &'a RetrievalConfig,
    _space: std::marker::PhantomData<S>,
}

impl<'a, S: VectorSpace> HybridQueryBuilder<'a, S> {
    pub fn new(params: &'a RetrievalConfig) -> Self {
        Self {
            params,
            _space: std::marker::PhantomData,
        }
    }

    /// Build the composite request for `query` with its pre-computed
    /// embedding. Time-sensitive mode prepends one fuzzy clause per
    /// date in the trailing window.
    pub fn build(
        &self,
        query: &str,
        query_vector: &Embedding<S>,
        mode: RetrievalMode,
        today: NaiveDate,
    ) -> RankingRequest {
        let mut lexical = Vec::new();

        if mode == RetrievalMode::TimeSensitive {
            for date in dates_within_days(today, self.params.recency_window_days) {
                lexical.push(LexicalClause::Fuzzy {
                    query: date,
                    boost: self.params.fuzzy_boost,
                });
            }
        }

        lexical.push(LexicalClause::Fuzzy {
            query: query.to_string(),
            boost: self.params.fuzzy_boost,
        });
        lexical.push(LexicalClause::ExactTerm {
            value: query.to_string(),
            boost: self.params.exact_boost,
        });
        lexical.push(LexicalClause::Alternate {
            query: query.to_string(),
            boost: self.params.alternate_boost,
        });
        lexical.push(LexicalClause::MatchAll {
            boost: self.params.match_all_boost,
        });

        RankingRequest {
            lexical,
            query_vector: query_vector.as_slice().to_vec(),
            lexical_weight: self.params.lexical_weight,
            date_range: None,
        }
    }

    /// Like [`build`](Self::build), with an inclusive hard date filter
    /// applied before ranking.
    pub fn build_with_date_range(
        &self,
        query: &str,
        query_vector: &Embedding<S>,
        range: DateRange,
    ) -> RankingRequest {
        let mut request = self.build(query, query_vector, RetrievalMode::Default, range.end);
        request.date_range = Some(range);
        request
    }
}
