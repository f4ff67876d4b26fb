//! Generation & Extraction
//!
//! One attempt moves through
//! `Compiling -> Invoking -> Extracting -> Validating -> Accepted | Rejected`.
//! Every transition is logged. There is no retry: a rejected attempt surfaces
//! its typed error to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::extraction::{parse_json, validate_plan};
use crate::plan::PlanSchema;
use crate::rag::{Completion, CompletionRequest};

/// Stage of a generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Prompt is being prepared
    Compiling,
    /// Waiting on the completion provider
    Invoking,
    /// Unwrapping and parsing the raw response
    Extracting,
    /// Checking the parsed value against the plan schema
    Validating,
    /// A valid plan was produced
    Accepted,
    /// The attempt failed with the given kind of error
    Rejected(ErrorKind),
}

impl AttemptState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected(_))
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compiling => f.write_str("compiling"),
            Self::Invoking => f.write_str("invoking"),
            Self::Extracting => f.write_str("extracting"),
            Self::Validating => f.write_str("validating"),
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected(kind) => write!(f, "rejected({kind:?})"),
        }
    }
}

/// Trace of one generation attempt
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    plan: &'static str,
    started: Instant,
    states: Vec<AttemptState>,
}

impl GenerationAttempt {
    /// Start an attempt in [`AttemptState::Compiling`]
    pub fn begin(plan: &'static str) -> Self {
        debug!(plan, state = %AttemptState::Compiling, "generation attempt started");
        Self {
            plan,
            started: Instant::now(),
            states: vec![AttemptState::Compiling],
        }
    }

    /// Current state
    pub fn state(&self) -> AttemptState {
        self.states
            .last()
            .copied()
            .unwrap_or(AttemptState::Compiling)
    }

    /// Every state visited, in order
    pub fn states(&self) -> &[AttemptState] {
        &self.states
    }

    fn advance(&mut self, next: AttemptState) {
        debug!(plan = self.plan, from = %self.state(), to = %next, "generation state");
        self.states.push(next);
    }

    fn reject(&mut self, error: Error) -> Error {
        let next = AttemptState::Rejected(error.kind());
        warn!(
            plan = self.plan,
            from = %self.state(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            error = %error,
            "generation rejected"
        );
        self.states.push(next);
        error
    }

    fn accept(&mut self) {
        self.advance(AttemptState::Accepted);
        info!(
            plan = self.plan,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "generation accepted"
        );
    }
}

/// Runs generation attempts against a completion provider
#[derive(Clone)]
pub struct Generator {
    completion: Arc<dyn Completion>,
    settings: GenerationConfig,
}

impl Generator {
    /// Create a generator
    pub fn new(completion: Arc<dyn Completion>, settings: GenerationConfig) -> Self {
        Self {
            completion,
            settings,
        }
    }

    /// Completion model name
    pub fn model(&self) -> &str {
        self.completion.model()
    }

    /// Generate a plan of type `T` from a compiled prompt
    pub async fn generate_structured<T: PlanSchema>(&self, prompt: &str) -> Result<T> {
        let mut attempt = GenerationAttempt::begin(T::NAME);
        self.run(&mut attempt, prompt).await
    }

    /// Like [`generate_structured`](Self::generate_structured), also returning the trace
    pub async fn generate_traced<T: PlanSchema>(
        &self,
        prompt: &str,
    ) -> (GenerationAttempt, Result<T>) {
        let mut attempt = GenerationAttempt::begin(T::NAME);
        let result = self.run(&mut attempt, prompt).await;
        (attempt, result)
    }

    async fn run<T: PlanSchema>(&self, attempt: &mut GenerationAttempt, prompt: &str) -> Result<T> {
        if prompt.trim().is_empty() {
            return Err(attempt.reject(Error::InvalidInput("prompt is empty".into())));
        }

        attempt.advance(AttemptState::Invoking);
        let raw = match self.invoke(prompt).await {
            Ok(raw) => raw,
            Err(e) => return Err(attempt.reject(e)),
        };

        attempt.advance(AttemptState::Extracting);
        let value = match parse_json(&raw) {
            Ok(value) => value,
            Err(e) => return Err(attempt.reject(e)),
        };

        attempt.advance(AttemptState::Validating);
        match validate_plan::<T>(value) {
            Ok(plan) => {
                attempt.accept();
                Ok(plan)
            }
            Err(e) => Err(attempt.reject(e)),
        }
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            prompt: prompt.to_string(),
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_output_tokens),
        };
        let timeout = self.settings.request_timeout();

        let raw = tokio::time::timeout(timeout, self.completion.complete(request))
            .await
            .map_err(|_| Error::ProviderTimeout {
                timeout_secs: timeout.as_secs(),
            })??;
        debug!(chars = raw.len(), "completion received");
        Ok(raw)
    }
}
