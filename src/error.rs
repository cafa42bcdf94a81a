//! Pipeline error taxonomy.
//!
//! One variant per failure class the flows distinguish. Transport and
//! decode failures against an external service collapse into the
//! variant for that service; callers branch on the class, never on the
//! message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or unusable configuration, including missing API key
    /// environment variables and unbuildable HTTP clients.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Embedding service failure. Not retried; a query or document
    /// that cannot be embedded aborts its enclosing operation.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The document store could not serve a search or count request.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The document store rejected or failed a write.
    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// Generative model transport or protocol failure. Distinct from
    /// [`PipelineError::StructuredOutput`]: these propagate
    /// immediately, without consuming retry attempts.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The model answered on every attempt but never produced output
    /// matching the requested shape. `attempts` is the total number of
    /// model calls made.
    #[error("structured output failed after {attempts} attempts: {detail}")]
    StructuredOutput { attempts: u32, detail: String },

    /// Interview mode outside the closed set.
    #[error("invalid interview mode: '{0}'")]
    InvalidMode(String),
}
