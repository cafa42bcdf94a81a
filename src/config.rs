use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the document store's REST API.
    pub endpoint: String,
    /// Index holding resume/content chunks (content embedding space).
    pub content_index: String,
    /// Index holding technology question material (question space).
    pub technical_index: String,
    /// Index holding dated behavioral question material (question space).
    pub behavioral_index: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retrieval tuning. The clause boosts and the lexical multiplier are
/// ad-hoc constants with no stated derivation; they are configuration,
/// not inferred calibration.
#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Multiplier applied to the lexical base score before it is added
    /// to the vector term.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,
    /// Boost for the fuzzy phrase match clause (w1).
    #[serde(default = "default_fuzzy_boost")]
    pub fuzzy_boost: f64,
    /// Boost for the exact term clause on the unanalyzed subfield (w2).
    /// Must exceed `fuzzy_boost`: an exact hit is stronger signal than
    /// a tokenized match.
    #[serde(default = "default_exact_boost")]
    pub exact_boost: f64,
    /// Boost for the alternate-analyzer match clause (w3).
    #[serde(default = "default_alternate_boost")]
    pub alternate_boost: f64,
    /// Boost for the catch-all clause. Near zero so every document is
    /// scoreable without the clause acting as a filter.
    #[serde(default = "default_match_all_boost")]
    pub match_all_boost: f64,
    /// Candidate count for the question-generation flow.
    #[serde(default = "default_question_top_k")]
    pub question_top_k: usize,
    /// Candidate count for the answer-evaluation flow.
    #[serde(default = "default_evaluation_top_k")]
    pub evaluation_top_k: usize,
    /// Context chunks sampled into a generation prompt.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Trailing calendar window (days back from today) expanded into
    /// per-date clauses for time-sensitive question generation.
    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: i64,
    /// Inclusive date-range width for time-sensitive evaluation.
    #[serde(default = "default_evaluation_recency_days")]
    pub evaluation_recency_days: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            fuzzy_boost: default_fuzzy_boost(),
            exact_boost: default_exact_boost(),
            alternate_boost: default_alternate_boost(),
            match_all_boost: default_match_all_boost(),
            question_top_k: default_question_top_k(),
            evaluation_top_k: default_evaluation_top_k(),
            sample_size: default_sample_size(),
            recency_window_days: default_recency_window_days(),
            evaluation_recency_days: default_evaluation_recency_days(),
        }
    }
}

fn default_lexical_weight() -> f64 {
    0.1
}
fn default_fuzzy_boost() -> f64 {
    1.0
}
fn default_exact_boost() -> f64 {
    2.0
}
fn default_alternate_boost() -> f64 {
    1.5
}
fn default_match_all_boost() -> f64 {
    0.001
}
fn default_question_top_k() -> usize {
    10
}
fn default_evaluation_top_k() -> usize {
    50
}
fn default_sample_size() -> usize {
    10
}
fn default_recency_window_days() -> i64 {
    2
}
fn default_evaluation_recency_days() -> i64 {
    30
}

/// Embedding service endpoints. The content and question collections
/// use distinct embedding spaces; their models and dimensionalities
/// are configured independently and never mixed.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub content: EmbeddingSpaceConfig,
    pub question: EmbeddingSpaceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSpaceConfig {
    pub endpoint: String,
    pub model: String,
    pub dims: usize,
    /// Environment variable holding the API key, if the service
    /// requires one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Base URL of the chat-completions style API.
    pub endpoint: String,
    /// Model identifier. Required; there is no fallback model.
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Total attempts for the structured-output retry loop.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Question variants requested per generation call; one is
    /// surfaced at random.
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_num_questions() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval weights
    if config.retrieval.lexical_weight < 0.0 {
        anyhow::bail!("retrieval.lexical_weight must be >= 0");
    }
    if config.retrieval.exact_boost <= config.retrieval.fuzzy_boost {
        anyhow::bail!("retrieval.exact_boost must be > retrieval.fuzzy_boost");
    }
    if config.retrieval.sample_size == 0 {
        anyhow::bail!("retrieval.sample_size must be >= 1");
    }
    if config.retrieval.question_top_k == 0 || config.retrieval.evaluation_top_k == 0 {
        anyhow::bail!("retrieval top_k values must be >= 1");
    }
    if config.retrieval.recency_window_days < 0 || config.retrieval.evaluation_recency_days < 0 {
        anyhow::bail!("retrieval recency windows must be >= 0 days");
    }

    // Validate embedding spaces
    for (name, space) in [
        ("content", &config.embedding.content),
        ("question", &config.embedding.question),
    ] {
        if space.dims == 0 {
            anyhow::bail!("embedding.{}.dims must be > 0", name);
        }
        if space.model.is_empty() {
            anyhow::bail!("embedding.{}.model must be specified", name);
        }
    }

    // Validate generation
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must be specified");
    }
    if config.generation.max_retries == 0 {
        anyhow::bail!("generation.max_retries must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_toml() -> String {
        r#"
[store]
endpoint = "http://localhost:9200"
content_index = "resume_chunks"
technical_index = "new_technology"
behavioral_index = "rag_behavioral"

[embedding.content]
endpoint = "http://localhost:8080"
model = "cc.300"
dims = 300

[embedding.question]
endpoint = "http://localhost:8081"
model = "bert-base"
dims = 768

[generation]
endpoint = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#
        .to_string()
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_defaults() {
        let f = write_config(&base_toml());
        let config = load_config(f.path()).unwrap();
        assert!((config.retrieval.lexical_weight - 0.1).abs() < 1e-12);
        assert_eq!(config.retrieval.question_top_k, 10);
        assert_eq!(config.retrieval.evaluation_top_k, 50);
        assert_eq!(config.generation.max_retries, 3);
        assert_eq!(config.generation.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_exact_boost_must_dominate_fuzzy() {
        let toml = format!(
            "{}\n[retrieval]\nexact_boost = 0.5\nfuzzy_boost = 1.0\n",
            base_toml()
        );
        let f = write_config(&toml);
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("exact_boost"));
    }

    #[test]
    fn test_zero_dims_rejected() {
        let toml = base_toml().replace("dims = 768", "dims = 0");
        let f = write_config(&toml);
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_missing_model_rejected() {
        let toml = base_toml().replace("model = \"gpt-4o-mini\"", "model = \"\"");
        let f = write_config(&toml);
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("generation.model"));
    }
}
