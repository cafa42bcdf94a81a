//! End-to-end flows: question generation, answer evaluation, and
//! source search.
//!
//! Each flow is synchronous per request — embed, query, retrieve,
//! sample, generate — with every stage depending on the previous
//! stage's output. Request-level timeouts belong to the caller; the
//! only bounded-iteration construct anywhere in a flow is the
//! structured-output retry loop.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::config::{RetrievalConfig, StoreConfig};
use crate::embedding::{ContentSpace, QuestionSpace, SpaceEmbedder};
use crate::error::PipelineError;
use crate::generate::{pick_question, StructuredGenerationClient};
use crate::ingest::{ingest, ChunkInput};
use crate::prompt;
use crate::query::{DateRange, HybridQueryBuilder, RetrievalMode};
use crate::retrieve::{dedupe_by_group, retrieve, ScoreEntry};
use crate::sample::sample;
use crate::schema::{parse_evaluation, parse_question_set, Evaluation};
use crate::store::DocumentStore;

/// Interview mode. The closed set; anything else is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewMode {
    Technical,
    Behavioral,
}

impl FromStr for InterviewMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(InterviewMode::Technical),
            "behavioral" => Ok(InterviewMode::Behavioral),
            other => Err(PipelineError::InvalidMode(other.to_string())),
        }
    }
}

impl InterviewMode {
    /// Behavioral material is dated news; its retrieval is
    /// time-sensitive.
    fn retrieval_mode(self) -> RetrievalMode {
        match self {
            InterviewMode::Technical => RetrievalMode::Default,
            InterviewMode::Behavioral => RetrievalMode::TimeSensitive,
        }
    }
}

/// Result of a question-generation request. `NoContext` means
/// retrieval found nothing to ground a question in — distinct from an
/// empty sample, and surfaced instead of calling the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    Question(String),
    NoContext,
}

/// Result of an answer-evaluation request.
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    Evaluated(Evaluation),
    NoContext,
}

///// The assembled pipeline: one document store, one embedder per
/// vector space, one structured-generation client.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    content_embedder: SpaceEmbedder<ContentSpace>,
    question_embedder: SpaceEmbedder<QuestionSpace>,
    generator: StructuredGenerationClient,
    store_config: StoreConfig,
    retrieval: RetrievalConfig,
    num_questions: usize,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        content_embedder: SpaceEmbedder<ContentSpace>,
        question_embedder: SpaceEmbedder<QuestionSpace>,
        generator: StructuredGenerationClient,
        store_config: StoreConfig,
        retrieval: RetrievalConfig,
        num_questions: usize,
    ) -> Self {
        Self {
            store,
            content_embedder,
            question_embedder,
            generator,
            store_config,
            retrieval,
            num_questions,
        }
    }

    fn question_index(&self, mode: InterviewMode) -> &str {
        match mode {
            InterviewMode::Technical => &self.store_config.technical_index,
            InterviewMode::Behavioral => &self.store_config.behavioral_index,
        }
    }

    /// Generate one interview question for `job` in `mode`.
    ///
    /// Retrieves related material, samples a bounded random context,
    /// asks the model for several question variants, and surfaces one
    /// at random. Behavioral mode queries by the trailing date window
    /// rather than the job text, so freshly ingested news is found even
    /// though the job string carries no date.
    pub async fn create_question(
        &self,
        job: &str,
        mode: InterviewMode,
    ) -> Result<QuestionOutcome, PipelineError> {
        let today = chrono::Local::now().date_naive();
        let index = self.question_index(mode);

        let effective_query = match mode {
            InterviewMode::Technical => job.to_string(),
            InterviewMode::Behavioral => {
                crate::query::dates_within_days(today, self.retrieval.recency_window_days).join(" ")
            }
        };

        let embedding = self.question_embedder.embed(&effective_query).await?;
        let builder: HybridQueryBuilder<QuestionSpace> = HybridQueryBuilder::new(&self.retrieval);
        let request = builder.build(&effective_query, &embedding, mode.retrieval_mode(), today);

        let hits = retrieve(
            self.store.as_ref(),
            index,
            &request,
            self.retrieval.question_top_k,
        )
        .await?;
        if hits.is_empty() {
            info!(index, "no related documents; skipping generation");
            return Ok(QuestionOutcome::NoContext);
        }

        let contents: Vec<String> = hits.into_iter().map(|hit| hit.content).collect();
        let context = sample(&contents, self.retrieval.sample_size).join(" ");

        let user_prompt = prompt::question_prompt(mode, job, &context, self.num_questions);
        let questions = self
            .generator
            .generate(prompt::SYSTEM_PROMPT, &user_prompt, |raw| {
                let questions = parse_question_set(raw)?;
                if questions.is_empty() {
                    return Err("question list is empty".to_string());
                }
                Ok(questions)
            })
            .await?;

        match pick_question(&questions) {
            Some(question) => Ok(QuestionOutcome::Question(question)),
            None => Ok(QuestionOutcome::NoContext),
        }
    }

    /// Evaluate `answer` to `question` for a candidate with `years` of
    /// experience in `job`.
    ///
    /// Behavioral mode restricts candidates to the trailing
    /// `evaluation_recency_days` window (inclusive hard filter);
    /// technical mode ranks the whole index. All retrieved material is
    /// given to the model as reference context.
    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        years: &str,
        job: &str,
        mode: InterviewMode,
    ) -> Result<EvaluationOutcome, PipelineError> {
        let today = chrono::Local::now().date_naive();
        let index = self.question_index(mode);

        let embedding = self.question_embedder.embed(question).await?;
        let builder: HybridQueryBuilder<QuestionSpace> = HybridQueryBuilder::new(&self.retrieval);
        let request = match mode {
            InterviewMode::Technical => {
                builder.build(question, &embedding, RetrievalMode::Default, today)
            }
            InterviewMode::Behavioral => builder.build_with_date_range(
                question,
                &embedding,
                DateRange::trailing(today, self.retrieval.evaluation_recency_days),
            ),
        };

        let hits = retrieve(
            self.store.as_ref(),
            index,
            &request,
            self.retrieval.evaluation_top_k,
        )
        .await?;
        if hits.is_empty() {
            info!(index, "no related documents; skipping evaluation");
            return Ok(EvaluationOutcome::NoContext);
        }

        let context = hits
            .into_iter()
            .map(|hit| hit.content)
            .collect::<Vec<_>>()
            .join(" ");

        let user_prompt = prompt::evaluation_prompt(mode, question, answer, years, job, &context);
        let evaluation = self
            .generator
            .generate(prompt::SYSTEM_PROMPT, &user_prompt, |raw| {
                parse_evaluation(raw)
            })
            .await?;

        Ok(EvaluationOutcome::Evaluated(evaluation))
    }

    /// Rank content sources against `query` and collapse to one entry
    /// per source, best hit first.
    pub async fn search_sources(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoreEntry>, PipelineError> {
        let today = chrono::Local::now().date_naive();
        let embedding = self.content_embedder.embed(query).await?;
        let builder: HybridQueryBuilder<ContentSpace> = HybridQueryBuilder::new(&self.retrieval);
        let request = builder.build(query, &embedding, RetrievalMode::Default, today);

        let hits = retrieve(
            self.store.as_ref(),
            &self.store_config.content_index,
            &request,
            top_k,
        )
        .await?;
        Ok(dedupe_by_group(&hits))
    }

    /// Index content chunks (resume collection).
    pub async fn ingest_content(&self, chunks: &[ChunkInput]) -> Result<u64, PipelineError> {
        ingest(
            self.store.as_ref(),
            &self.store_config.content_index,
            &self.content_embedder,
            chunks,
        )
        .await
    }

    /// Index question material for `mode` (question collection).
    pub async fn ingest_questions(
        &self,
        mode: InterviewMode,
        chunks: &[ChunkInput],
    ) -> Result<u64, PipelineError> {
        ingest(
            self.store.as_ref(),
            self.question_index(mode),
            &self.question_embedder,
            chunks,
        )
        .await
    }
}

/// Split extracted text into fixed-size chunks with a small overlap,
/// tagging each with the source's group key and date.
pub fn chunk_text(
    group_key: &str,
    text: &str,
    date: Option<NaiveDate>,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkInput> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        if !piece.trim().is_empty() {
            chunks.push(ChunkInput {
                group_key: group_key.to_string(),
                text: piece,
                date,
            });
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_closed_set() {
        assert_eq!(
            InterviewMode::from_str("technical").unwrap(),
            InterviewMode::Technical
        );
        assert_eq!(
            InterviewMode::from_str("behavioral").unwrap(),
            InterviewMode::Behavioral
        );
        assert!(matches!(
            InterviewMode::from_str("casual"),
            Err(PipelineError::InvalidMode(_))
        ));
        // Case-sensitive: the set is closed over exact names.
        assert!(InterviewMode::from_str("Technical").is_err());
    }

    #[test]
    fn test_chunk_text_overlap() {
        let chunks = chunk_text("src", "abcdefghij", None, 4, 1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        assert!(chunks.iter().all(|c| c.group_key == "src"));
    }

    #[test]
    fn test_chunk_text_short_input() {
        let chunks = chunk_text("src", "ab", None, 180, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "ab");
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("src", "", None, 180, 10).is_empty());
        assert!(chunk_text("src", "abc", None, 0, 0).is_empty());
    }
}
