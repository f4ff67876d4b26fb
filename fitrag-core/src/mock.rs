//! Deterministic providers for testing
//!
//! [`HashEmbeddings`] maps text to a feature-hashed bag of words, so texts
//! sharing words are close in cosine space. [`ScriptedCompletion`] answers
//! from canned responses and records every request it receives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::rag::{Completion, CompletionRequest, Embeddings};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bag-of-words embeddings with optional latency and failure injection
#[derive(Debug)]
pub struct HashEmbeddings {
    dimension: usize,
    model: String,
    delay: Option<Duration>,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl HashEmbeddings {
    /// Create an embedder producing `dimension`-sized vectors
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model: "mock-hash-embedding".to_string(),
            delay: None,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep this long on every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the `n`-th call (1-based) with a connectivity error
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Number of embedding calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector for `text`, without side effects
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl Embeddings for HashEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(Error::Connectivity(format!(
                "embedding endpoint unreachable (call {call})"
            )));
        }
        Ok(self.vector(text))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Completion provider answering from scripted responses
///
/// Rules are checked first: the first rule whose needle occurs in the prompt
/// wins. Otherwise the next queued response is used.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    model: String,
    rules: Vec<(String, String)>,
    queue: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    /// Create an empty script
    pub fn new() -> Self {
        Self {
            model: "mock-completion".to_string(),
            ..Default::default()
        }
    }

    /// Answer `response` to any prompt containing `needle`
    pub fn when_prompt_contains(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Queue a response
    pub fn push_response(&self, response: impl Into<String>) {
        self.queue.lock().push_back(Ok(response.into()));
    }

    /// Queue a failure
    pub fn push_error(&self, error: Error) {
        self.queue.lock().push_back(Err(error));
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((_, response)) = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
        {
            return Ok(response.clone());
        }

        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::ProviderApi("no scripted response left".into())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
