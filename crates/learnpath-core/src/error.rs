//! Error types for providers and the generation engine.
//!
//! `ProviderError` lives here rather than in the providers crate so the engine
//! can downcast and decide whether a failure is worth retrying.

use thiserror::Error;

/// Errors that can occur when talking to a text-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (missing or invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The provider answered but the body held no usable text.
    #[error("empty response from {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Returns `true` if retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// The server's retry-after hint, if it sent one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Why the engine could not produce a quiz or roadmap.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider kept failing, or failed permanently.
    #[error("generation failed after {attempts} attempt(s): {last_error:#}")]
    Provider {
        attempts: u32,
        last_error: anyhow::Error,
    },

    /// Every attempt returned text that is not JSON.
    #[error("response is not valid JSON: {0}")]
    MalformedResponse(String),

    /// Parsed JSON that is not a usable quiz.
    #[error("invalid quiz structure: {}", .0.join("; "))]
    InvalidQuiz(Vec<String>),

    /// Parsed JSON that is not a usable roadmap.
    #[error("invalid roadmap structure: {}", .0.join("; "))]
    InvalidRoadmap(Vec<String>),
}

impl GenerationError {
    /// Validation failures, as opposed to transport or parse failures.
    pub fn is_invalid_structure(&self) -> bool {
        matches!(
            self,
            GenerationError::InvalidQuiz(_) | GenerationError::InvalidRoadmap(_)
        )
    }
}
