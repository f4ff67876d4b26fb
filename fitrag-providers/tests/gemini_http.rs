//! Gemini clients against a local one-shot HTTP responder

use fitrag_core::error::ErrorKind;
use fitrag_providers::gemini::{GeminiCompletion, GeminiEmbeddings};
use fitrag_providers::{Completion, CompletionRequest, Embeddings, Error};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one response and hand back the raw request text
async fn serve_once(
    status: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&request[..end]).to_string();
                let length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{extra_headers}\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).to_string()
    });

    (base_url, handle)
}

fn completion(base_url: &str) -> GeminiCompletion {
    GeminiCompletion::new("test-key", "gemini-1.5-flash")
        .unwrap()
        .with_base_url(base_url)
}

fn embeddings(base_url: &str) -> GeminiEmbeddings {
    GeminiEmbeddings::new("test-key", "models/embedding-001")
        .unwrap()
        .with_base_url(base_url)
}

#[tokio::test]
async fn test_generate_content_returns_candidate_text() {
    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "{\"ok\": "}, {"text": "true}"}]},
            "finishReason": "STOP"
        }]
    });
    let (base_url, server) = serve_once("200 OK", "", body.to_string()).await;

    let request = CompletionRequest {
        prompt: "Create a 4-week workout plan".to_string(),
        temperature: Some(0.7),
        max_tokens: Some(8192),
    };
    let text = completion(&base_url).complete(request).await.unwrap();
    assert_eq!(text, "{\"ok\": true}");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent"));
    assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
    assert!(raw.contains("\"maxOutputTokens\":8192"));
    assert!(raw.contains("Create a 4-week workout plan"));
}

#[tokio::test]
async fn test_rate_limit_uses_retry_after() {
    let body = json!({"error": {"code": 429, "message": "Resource exhausted"}});
    let (base_url, server) =
        serve_once("429 Too Many Requests", "retry-after: 17\r\n", body.to_string()).await;

    let err = completion(&base_url)
        .complete(CompletionRequest::new("hi"))
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, Error::ProviderRateLimit { retry_after_secs: 17 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rejected_key_is_auth_error() {
    let body = json!({"error": {"code": 401, "message": "API key not valid"}});
    let (base_url, server) = serve_once("401 Unauthorized", "", body.to_string()).await;

    let err = embeddings(&base_url).embed("Push Ups").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, Error::ProviderAuth(_)));
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_embed_document_and_query_task_types() {
    let body = json!({"embedding": {"values": [0.25, -0.5, 1.0]}});

    let (base_url, server) = serve_once("200 OK", "", body.to_string()).await;
    let vector = embeddings(&base_url).embed("Daal Chana").await.unwrap();
    assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1beta/models/embedding-001:embedContent"));
    assert!(raw.contains("RETRIEVAL_DOCUMENT"));

    let (base_url, server) = serve_once("200 OK", "", body.to_string()).await;
    embeddings(&base_url).embed_query("Pakistani food items").await.unwrap();
    assert!(server.await.unwrap().contains("RETRIEVAL_QUERY"));
}

#[tokio::test]
async fn test_empty_embedding_is_api_error() {
    let body = json!({"embedding": {"values": []}});
    let (base_url, server) = serve_once("200 OK", "", body.to_string()).await;

    let err = embeddings(&base_url).embed("x").await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, Error::ProviderApi(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connectivity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());
    drop(listener);

    let err = completion(&base_url)
        .complete(CompletionRequest::new("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.is_retryable());
}
