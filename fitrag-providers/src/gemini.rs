//! Google Gemini provider implementation
//!
//! [`GeminiCompletion`] calls `generateContent` and [`GeminiEmbeddings`] calls
//! `embedContent`, both against the v1beta REST API.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fitrag_core::config::EngineConfig;
use fitrag_core::error::snippet;

use crate::{Completion, CompletionRequest, Embeddings, Error, HttpConfig, Result};

/// Default API root
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Wait suggested to callers when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared HTTP plumbing for both endpoints
#[derive(Clone)]
struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClient {
    fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }
        let client = HttpConfig::with_timeout(timeout_secs).build_client()?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            timeout_secs,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.base_url.trim_end_matches('/'),
            model_path(model),
            method
        )
    }

    async fn post<B, R>(&self, model: &str, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(model, method);
        debug!(%url, "gemini request");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, retry_after, &text);
            warn!(%status, error = %err, "gemini request failed");
            return Err(err);
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::ProviderApi(format!("unreadable Gemini response: {e}")))
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Resource name of a model: `gemini-1.5-flash` becomes `models/gemini-1.5-flash`
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn require_api_key(config: &EngineConfig) -> Result<String> {
    config
        .provider
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            Error::Config(format!(
                "{} not set",
                fitrag_core::config::ENV_API_KEY
            ))
        })
}

fn transport_error(err: reqwest::Error, timeout_secs: u64) -> Error {
    if err.is_timeout() {
        Error::ProviderTimeout { timeout_secs }
    } else if err.is_connect() {
        Error::Connectivity(format!("Gemini unreachable: {err}"))
    } else {
        Error::Http(err)
    }
}

/// Map a non-success response to an error
pub(crate) fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| snippet(body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::ProviderAuth(format!("Gemini rejected credentials ({status}): {message}"))
        }
        StatusCode::TOO_MANY_REQUESTS => Error::ProviderRateLimit {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => Error::ProviderApi(format!("Gemini API error {status}: {message}")),
    }
}

// ============ Wire format ============

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::ProviderApi(format!("prompt blocked: {reason}")));
        }
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::ProviderApi("response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::ProviderApi(format!(
                "response has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: TaskType,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

// ============ Completion ============

/// Gemini text generation
#[derive(Debug, Clone)]
pub struct GeminiCompletion {
    client: GeminiClient,
    model: String,
}

impl GeminiCompletion {
    /// Create from API key and model name
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key, HttpConfig::default().timeout_secs)?,
            model: model.into(),
        })
    }

    /// Create from engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut client = GeminiClient::new(
            require_api_key(config)?,
            config.generation.request_timeout_secs,
        )?;
        if let Some(base_url) = &config.provider.base_url {
            client.base_url = base_url.clone();
        }
        Ok(Self {
            client,
            model: config.generation.model.clone(),
        })
    }

    /// Point at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Completion for GeminiCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), &request.prompt)],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response: GenerateContentResponse = self
            .client
            .post(&self.model, "generateContent", &body)
            .await?;
        response.into_text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============ Embeddings ============

/// Gemini text embeddings
#[derive(Debug, Clone)]
pub struct GeminiEmbeddings {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbeddings {
    /// Create from API key and model name
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key, HttpConfig::default().timeout_secs)?,
            model: model.into(),
        })
    }

    /// Create from engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut client = GeminiClient::new(
            require_api_key(config)?,
            config.embedding.request_timeout_secs,
        )?;
        if let Some(base_url) = &config.provider.base_url {
            client.base_url = base_url.clone();
        }
        Ok(Self {
            client,
            model: config.embedding.model.clone(),
        })
    }

    /// Point at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    async fn embed_as(&self, text: &str, task_type: TaskType) -> Result<Vec<f32>> {
        let body = EmbedContentRequest {
            model: model_path(&self.model),
            content: Content::text(None, text),
            task_type,
        };
        let response: EmbedContentResponse =
            self.client.post(&self.model, "embedContent", &body).await?;

        if response.embedding.values.is_empty() {
            return Err(Error::ProviderApi("empty embedding returned".to_string()));
        }
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl Embeddings for GeminiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_as(text, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_as(text, TaskType::RetrievalQuery).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitrag_core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_model_path() {
        assert_eq!(model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(model_path("models/embedding-001"), "models/embedding-001");
    }

    #[test]
    fn test_generate_request_is_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), "hello")],
            generation_config: GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(8192),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {"temperature": 0.7, "maxOutputTokens": 8192}
            })
        );
    }

    #[test]
    fn test_embed_request_shape() {
        let body = EmbedContentRequest {
            model: model_path("embedding-001"),
            content: Content::text(None, "Push Ups"),
            task_type: TaskType::RetrievalQuery,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "models/embedding-001");
        assert_eq!(value["taskType"], "RETRIEVAL_QUERY");
        assert!(value["content"].get("role").is_none());
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "```json\n"}, {"text": "{}\n```"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn test_response_without_text_is_api_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = response.into_text().unwrap_err();
        assert!(matches!(err, Error::ProviderApi(_)));
        assert!(err.to_string().contains("SAFETY"));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap();
        assert!(blocked.into_text().unwrap_err().to_string().contains("blocked"));
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        let err = status_error(StatusCode::FORBIDDEN, None, body);
        assert!(matches!(err, Error::ProviderAuth(_)));
        assert!(err.to_string().contains("API key not valid"));

        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(12), ""),
            Error::ProviderRateLimit { retry_after_secs: 12 }
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, None, ""),
            Error::ProviderRateLimit {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            }
        ));

        let err = status_error(StatusCode::BAD_GATEWAY, None, "upstream down");
        assert!(matches!(err, Error::ProviderApi(_)));
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = EngineConfig::default();
        let err = GeminiCompletion::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let mut config = EngineConfig::default();
        config.provider.api_key = Some("secret-key".into());
        config.provider.base_url = Some("http://localhost:9".into());
        let embeddings = GeminiEmbeddings::from_config(&config).unwrap();
        assert_eq!(embeddings.model(), "models/embedding-001");
        assert_eq!(
            embeddings.client.endpoint(embeddings.model(), "embedContent"),
            "http://localhost:9/models/embedding-001:embedContent"
        );
        assert!(!format!("{embeddings:?}").contains("secret-key"));
    }
}
