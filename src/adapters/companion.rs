//! HTTP client for the companion video service.
//!
//! Endpoint: POST {endpoint}/generate
//!
//! Request:  {"title", "content", "content_type", "node_title", "ping_pong": true}
//! Success:  200 {"success": true, "video_path": "..."}
//! Failure:  200 {"success": false, "error": "..."} or any non-200 status

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::GenerationBackend;
use crate::config::GeneratorSettings;
use crate::domain::{GenerationError, GenerationRequest, GenerationResult};

/// Message used when the service rejects a render without saying why
const GENERIC_FAILURE: &str = "video generation failed";

/// Wire payload for the generate endpoint
#[derive(Debug, Serialize)]
pub struct GeneratePayload<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub content_type: &'a str,
    /// The service labels the source node of the render with this
    pub node_title: &'a str,
    /// Loop the rendered clip forwards and back
    pub ping_pong: bool,
}

impl<'a> From<&'a GenerationRequest> for GeneratePayload<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            title: &request.title,
            content: &request.content,
            content_type: &request.content_type,
            node_title: &request.source_label,
            ping_pong: true,
        }
    }
}

/// Serialize a request into the exact bytes sent on the wire
pub fn encode_request(request: &GenerationRequest) -> Result<Vec<u8>, GenerationError> {
    serde_json::to_vec(&GeneratePayload::from(request))
        .map_err(|e| GenerationError::EncodingFailed(e.to_string()))
}

/// Validate a completed HTTP exchange.
///
/// Checks run in order: status, JSON object, `success` flag, `video_path`.
pub fn interpret_response(status: u16, body: &str) -> Result<GenerationResult, GenerationError> {
    if status != 200 {
        return Err(GenerationError::HttpStatus {
            code: status,
            body: body.to_string(),
        });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("body is not JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| GenerationError::InvalidResponse("body is not a JSON object".to_string()))?;

    if object.get("success").and_then(Value::as_bool) != Some(true) {
        let message = object
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or(GENERIC_FAILURE);
        return Err(GenerationError::GenerationFailed(message.to_string()));
    }

    let video_path = object
        .get("video_path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::InvalidResponse("missing string field 'video_path'".to_string())
        })?;

    Ok(GenerationResult::new(video_path))
}

/// Client for the companion's generate endpoint.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    /// Full URL of the generate endpoint
    generate_url: String,
    /// Per-request timeout
    timeout: Duration,
    client: reqwest::Client,
}

impl GenerationClient {
    /// Create a client for a service rooted at `endpoint`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            generate_url: format!("{}/generate", endpoint.trim_end_matches('/')),
            timeout,
            client,
        })
    }

    /// Create from config
    pub fn from_settings(settings: &GeneratorSettings) -> Result<Self> {
        Self::new(&settings.endpoint, settings.client_timeout)
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }
}

#[async_trait]
impl GenerationBackend for GenerationClient {
    async fn send(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError> {
        let body = encode_request(request)?;

        debug!(
            url = %self.generate_url,
            bytes = body.len(),
            title = %request.title,
            "Sending generate request"
        );

        let response = self
            .client
            .post(&self.generate_url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(status, bytes = text.len(), "Generate response received");

        interpret_response(status, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> GenerationRequest {
        GenerationRequest::new("On Time", "Waste no more time.", "quote", "Meditations")
    }

    #[test]
    fn test_payload_fields() {
        let bytes = encode_request(&sample_request()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "title": "On Time",
                "content": "Waste no more time.",
                "content_type": "quote",
                "node_title": "Meditations",
                "ping_pong": true,
            })
        );
    }

    #[test]
    fn test_generate_url() {
        let client = GenerationClient::new("http://127.0.0.1:8189/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.generate_url(), "http://127.0.0.1:8189/generate");
    }

    #[test]
    fn test_success_response() {
        let result = interpret_response(200, r#"{"success": true, "video_path": "/tmp/a.mp4"}"#);
        assert_eq!(result, Ok(GenerationResult::new("/tmp/a.mp4")));
    }

    #[test]
    fn test_non_200_keeps_body() {
        let result = interpret_response(503, "overloaded");
        assert_eq!(
            result,
            Err(GenerationError::HttpStatus {
                code: 503,
                body: "overloaded".to_string()
            })
        );
    }

    #[test]
    fn test_explicit_failure_message() {
        let result = interpret_response(200, r#"{"success": false, "error": "render engine crashed"}"#);
        assert_eq!(
            result,
            Err(GenerationError::GenerationFailed(
                "render engine crashed".to_string()
            ))
        );
    }

    #[test]
    fn test_failure_without_message_uses_fallback() {
        let result = interpret_response(200, r#"{"success": false}"#);
        assert_eq!(
            result,
            Err(GenerationError::GenerationFailed(GENERIC_FAILURE.to_string()))
        );

        // An empty message is passed through as sent
        let result = interpret_response(200, r#"{"success": false, "error": ""}"#);
        assert_eq!(result, Err(GenerationError::GenerationFailed(String::new())));

        // A missing or non-boolean flag is treated the same way
        let result = interpret_response(200, r#"{"video_path": "/tmp/a.mp4"}"#);
        assert!(matches!(result, Err(GenerationError::GenerationFailed(_))));
    }

    #[test]
    fn test_invalid_bodies() {
        assert!(matches!(
            interpret_response(200, "<html>oops</html>"),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"["success", true]"#),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"{"success": true}"#),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"{"success": true, "video_path": 42}"#),
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
