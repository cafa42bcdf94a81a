//! Generative model adapter and structured-output client.
//!
//! The [`GenerativeModel`] trait is the request/response capability the
//! rest of the pipeline programs against; [`ChatModel`] is the concrete
//! adapter for an OpenAI-style chat-completions API. Decoding is always
//! pinned to the lowest-entropy setting because downstream consumers
//! parse the output as structured data and cannot tolerate stylistic
//! variance.
//!
//! [`StructuredGenerationClient`] owns the retry discipline: a bounded
//! loop that re-asks the model while the response fails schema
//! validation, then returns a terminal error value. Transport and API
//! failures are not retried here — only parse failures are transient.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::error::PipelineError;

/// Decoding parameters sent with every completion request.
#[derive(Debug, Clone, Copy)]
pub struct DecodingParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl DecodingParams {
    /// Lowest-entropy decoding: temperature and top-p both zero.
    pub fn pinned() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.0,
        }
    }
}

/// Black-box generative model service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &DecodingParams,
    ) -> Result<String, PipelineError>;
}

/// Adapter for an OpenAI-style `POST /chat/completions` endpoint.
pub struct ChatModel {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatModel {
    /// Create an adapter from configuration. The API key and model
    /// identifier are required; a missing credential is a
    /// configuration error at startup, not a runtime surprise.
    pub fn new(config: &GenerationConfig) -> Result<Self, PipelineError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PipelineError::Configuration(format!(
                "{} environment variable not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl GenerativeModel for ChatModel {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &DecodingParams,
    ) -> Result<String, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": params.temperature,
            "top_p": params.top_p,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "completions API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Generation("completion missing choices[0].message.content".into())
            })
    }
}

/// Bounded retry client for schema-shaped generation.
///
/// Each call runs the same three-state loop: attempting while the
/// response fails to parse and attempts remain, parsed on the first
/// response that validates, exhausted once `max_retries` total
/// attempts have failed. The exhausted state is returned as an error
/// value; nothing here panics and the loop always terminates.
pub struct StructuredGenerationClient {
    model: Arc<dyn GenerativeModel>,
    max_retries: u32,
    retry_delay: Duration,
}

impl StructuredGenerationClient {
    pub fn new(model: Arc<dyn GenerativeModel>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            model,
            max_retries,
            retry_delay,
        }
    }

    /// Ask the model for `schema`-shaped output, retrying on parse
    /// failure up to `max_retries` total attempts.
    ///
    /// Model-call failures propagate immediately: retrying cannot fix
    /// a bad credential or an unreachable endpoint. Only parse
    /// failures are retried, after a fixed short delay.
    pub async fn generate<T, F>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        parse: F,
    ) -> Result<T, PipelineError>
    where
        F: Fn(&str) -> Result<T, String>,
    {
        let params = DecodingParams::pinned();
        let mut last_failure = String::new();

        for attempt in 1..=self.max_retries {
            let raw = self
                .model
                .complete(system_prompt, user_prompt, &params)
                .await?;

            match parse(&raw) {
                Ok(parsed) => return Ok(parsed),
                Err(detail) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        %detail,
                        "structured output failed to parse"
                    );
                    last_failure = detail;
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(PipelineError::StructuredOutput {
            attempts: self.max_retries,
            detail: last_failure,
        })
    }
}

/// Select one question uniformly at random from a validated set. The
/// model is asked for several variants; exactly one is surfaced per
/// call so repeated invocations vary.
pub fn pick_question(questions: &[String]) -> Option<String> {
    questions.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted model: returns canned responses in order, counting
    /// calls.
    struct ScriptedModel {
        responses: Vec<String>,
        calls: AtomicU32,
    }

    impl ScriptedModel {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(str::to_string).collect(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _params: &DecodingParams,
        ) -> Result<String, PipelineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self
                .responses
                .get(n)
                .cloned()
                .unwrap_or_else(|| self.responses.last().cloned().unwrap_or_default()))
        }
    }

    fn client(model: Arc<ScriptedModel>, max_retries: u32) -> StructuredGenerationClient {
        StructuredGenerationClient::new(model, max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let model = Arc::new(ScriptedModel::new(vec![r#"{"ok": true}"#]));
        let c = client(model.clone(), 3);
        let value: serde_json::Value = c
            .generate("sys", "user", |raw| {
                serde_json::from_str(raw).map_err(|e| e.to_string())
            })
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_malformed_attempts() {
        let model = Arc::new(ScriptedModel::new(vec![
            "not json",
            "still not json",
            r#"{"ok": true}"#,
        ]));
        let c = client(model.clone(), 3);
        let value: serde_json::Value = c
            .generate("sys", "user", |raw| {
                serde_json::from_str(raw).map_err(|e| e.to_string())
            })
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_makes_exactly_max_retries_attempts() {
        let model = Arc::new(ScriptedModel::new(vec!["never json"]));
        let c = client(model.clone(), 3);
        let result: Result<serde_json::Value, _> = c
            .generate("sys", "user", |raw| {
                serde_json::from_str(raw).map_err(|e| e.to_string())
            })
            .await;

        match result {
            Err(PipelineError::StructuredOutput { attempts, detail }) => {
                assert_eq!(attempts, 3);
                assert!(!detail.is_empty());
            }
            other => panic!("expected StructuredOutput error, got {:?}", other.err()),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_model_error_propagates_without_retry() {
        struct FailingModel;

        #[async_trait]
        impl GenerativeModel for FailingModel {
            async fn complete(
                &self,
                _system: &str,
                _user: &str,
                _params: &DecodingParams,
            ) -> Result<String, PipelineError> {
                Err(PipelineError::Generation("boom".into()))
            }
        }

        let c = StructuredGenerationClient::new(
            Arc::new(FailingModel),
            3,
            Duration::from_millis(1),
        );
        let result: Result<serde_json::Value, _> = c
            .generate("sys", "user", |raw| {
                serde_json::from_str(raw).map_err(|e| e.to_string())
            })
            .await;
        assert!(matches!(result, Err(PipelineError::Generation(_))));
    }

    #[test]
    fn test_pick_question_from_singleton() {
        let questions = vec!["only".to_string()];
        assert_eq!(pick_question(&questions), Some("only".to_string()));
    }

    #[test]
    fn test_pick_question_empty_is_none() {
        assert_eq!(pick_question(&[]), None);
    }

    #[test]
    fn test_pinned_decoding_is_zero_entropy() {
        let params = DecodingParams::pinned();
        assert_eq!(params.temperature, 0.0);
        assert_eq!(params.top_p, 0.0);
    }
}
