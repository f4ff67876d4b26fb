//! Error types for the fitrag engine

use thiserror::Error;

/// Result type alias using fitrag's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Longest diagnostic snippet kept from a rejected model response
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Main error type for the fitrag engine
#[derive(Debug, Error)]
pub enum Error {
    // ============ Connectivity Errors ============
    /// A backing service (source store, vector store, model provider) is unreachable
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ============ Provider Errors ============
    /// Provider API error
    #[error("Provider API error: {0}")]
    ProviderApi(String),

    /// Provider authentication failed
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider rate limit exceeded
    #[error("Provider rate limit exceeded: retry after {retry_after_secs}s")]
    ProviderRateLimit {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Provider call did not finish in time
    #[error("Provider call timed out after {timeout_secs}s")]
    ProviderTimeout {
        /// Timeout duration in seconds
        timeout_secs: u64,
    },

    // ============ Generation Errors ============
    /// Model output is not parseable JSON
    #[error("Malformed model output: {reason} (snippet: {snippet:?})")]
    MalformedOutput {
        /// Why parsing failed
        reason: String,
        /// Truncated copy of the offending text
        snippet: String,
    },

    /// Parsed JSON does not satisfy the plan schema
    #[error("Schema violation at `{field}`: {reason}")]
    SchemaViolation {
        /// Path of the first failing field, e.g. `weeks[0].days[1].exercises[2].sets`
        field: String,
        /// What was wrong with it
        reason: String,
    },

    // ============ Index Errors ============
    /// An operation ran before the vector index was initialized
    #[error("Engine not ready: {0}")]
    EngineNotReady(String),

    /// Embedding a rebuild batch failed; the rebuild was abandoned
    #[error("Embedding batch {batch}/{total_batches} failed: {source}")]
    EmbeddingBatch {
        /// 1-based index of the failing batch
        batch: usize,
        /// Number of batches in the rebuild
        total_batches: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Vector or source store backend error
    #[error("Store error: {0}")]
    Store(String),

    // ============ Input Errors ============
    /// Caller supplied invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Engine configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ System Errors ============
    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Generic Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Some backing service could not be reached or answered with an error
    Connectivity,
    /// Model output was not JSON
    MalformedOutput,
    /// Model output was JSON but not a valid plan
    SchemaViolation,
    /// Index not initialized
    EngineNotReady,
    /// Bad request from the caller
    InvalidInput,
    /// Everything else
    Internal,
}

impl Error {
    /// Create a malformed-output error, keeping a bounded snippet of the text
    pub fn malformed_output(reason: impl Into<String>, text: &str) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
            snippet: snippet(text),
        }
    }

    /// Create a schema violation for the given field path
    pub fn schema_violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Classify this error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_)
            | Self::Http(_)
            | Self::ProviderApi(_)
            | Self::ProviderAuth(_)
            | Self::ProviderRateLimit { .. }
            | Self::ProviderTimeout { .. }
            | Self::Store(_) => ErrorKind::Connectivity,
            Self::EmbeddingBatch { source, .. } => source.kind(),
            Self::MalformedOutput { .. } => ErrorKind::MalformedOutput,
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Self::EngineNotReady(_) => ErrorKind::EngineNotReady,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Config(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is retryable
    ///
    /// Output-quality failures are never retryable here; the caller decides
    /// whether to ask the model again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderRateLimit { .. }
            | Self::ProviderTimeout { .. }
            | Self::Connectivity(_)
            | Self::Http(_) => true,
            Self::EmbeddingBatch { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Truncate `text` to [`MAX_SNIPPET_CHARS`] characters.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(MAX_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_is_bounded_on_char_boundary() {
        let text = "é".repeat(MAX_SNIPPET_CHARS + 10);
        let cut = snippet(&text);
        assert_eq!(cut.chars().count(), MAX_SNIPPET_CHARS + 1);
        assert!(cut.ends_with('…'));

        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::malformed_output("bad", "{").kind(),
            ErrorKind::MalformedOutput
        );
        assert_eq!(
            Error::schema_violation("sets", "too big").kind(),
            ErrorKind::SchemaViolation
        );
        assert_eq!(
            Error::EngineNotReady("index".into()).kind(),
            ErrorKind::EngineNotReady
        );

        let nested = Error::EmbeddingBatch {
            batch: 2,
            total_batches: 4,
            source: Box::new(Error::ProviderRateLimit { retry_after_secs: 5 }),
        };
        assert_eq!(nested.kind(), ErrorKind::Connectivity);
        assert!(nested.is_retryable());
    }

    #[test]
    fn test_output_errors_are_not_retryable() {
        assert!(!Error::malformed_output("bad", "x").is_retryable());
        assert!(!Error::schema_violation("daily_totals", "missing").is_retryable());
        assert!(Error::ProviderTimeout { timeout_secs: 1 }.is_retryable());
    }

    #[test]
    fn test_embedding_batch_message_names_batch() {
        let err = Error::EmbeddingBatch {
            batch: 3,
            total_batches: 7,
            source: Box::new(Error::Connectivity("refused".into())),
        };
        assert!(err.to_string().contains("3/7"));
    }
}
