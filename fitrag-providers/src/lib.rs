//! # fitrag Providers
//!
//! Embedding and completion model implementations for the fitrag engine.

#![warn(missing_docs)]

// Core types the provider traits are written against
pub use fitrag_core::error::{Error, Result};
pub use fitrag_core::rag::{Completion, CompletionRequest, Embeddings};

#[cfg(feature = "gemini")]
pub mod gemini;

/// Settings for the shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout, seconds
    pub timeout_secs: u64,
    /// How long an idle pooled connection is kept, seconds
    pub pool_idle_timeout_secs: u64,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpConfig {
    /// Config with the given request timeout
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Default::default()
        }
    }

    /// Build the client; fails only if TLS setup fails
    pub fn build_client(&self) -> Result<reqwest::Client> {
        use std::time::Duration;

        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .build()
            .map_err(|e| Error::Internal(e.to_string()))
    }
}
