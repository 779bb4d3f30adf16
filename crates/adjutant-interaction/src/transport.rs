//! Transport layer for the remote Assistants API.
//!
//! The [`Transport`] trait is the seam between the resource operations and
//! the network: production code goes through [`HttpTransport`], tests inject
//! a scripted implementation. No retries live at this layer; the only
//! repetition anywhere is the orchestrator's wait-for-completion loop.

use adjutant_core::{AdjutantError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ApiConfig;

/// Protocol-version marker the Assistants API requires on JSON requests.
const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// A file to be uploaded as a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Filename reported to the remote API
    pub file_name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// Purpose tag; always "assistants" for this client
    pub purpose: String,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(FileUpload),
}

/// One request to the remote API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    /// A GET request with no body.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    /// A POST request with a JSON body.
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    /// A POST request with no body.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    /// A POST request with a multipart file body.
    pub fn post_multipart(path: impl Into<String>, upload: FileUpload) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Multipart(upload),
        }
    }

    /// True for multipart bodies, which carry only the bearer credential;
    /// the remote API rejects manual content-type or version headers there.
    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }
}

/// Issues authenticated requests and normalizes success/error shapes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request; success carries the parsed JSON payload, failure a
    /// normalized [`AdjutantError::Transport`].
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Production transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    config: ApiConfig,
}

impl HttpTransport {
    /// Creates a transport for the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        tracing::debug!(method = %request.method, %url, "sending API request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("Authorization", format!("Bearer {}", self.config.api_key));

        if !request.is_multipart() {
            builder = builder.header(BETA_HEADER.0, BETA_HEADER.1);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(upload) => {
                let part = reqwest::multipart::Part::bytes(upload.bytes)
                    .file_name(upload.file_name);
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("purpose", upload.purpose);
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(|e| {
            AdjutantError::transport(format!("Request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| AdjutantError::transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(AdjutantError::transport(parse_error_message(
                status, &body_text,
            )));
        }

        serde_json::from_str(&body_text)
            .map_err(|e| AdjutantError::transport(format!("Failed to parse API response: {}", e)))
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extracts the structured error message from a non-success body, falling
/// back to the raw response text when it is not the expected JSON shape.
fn parse_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(wrapper) => wrapper.error.message,
        Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_body_is_unwrapped() {
        let body = r#"{"error": {"message": "Invalid model", "type": "invalid_request_error"}}"#;
        let message = parse_error_message(StatusCode::BAD_REQUEST, body);
        assert_eq!(message, "Invalid model");
    }

    #[test]
    fn unparseable_error_body_keeps_raw_text() {
        let message = parse_error_message(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        assert_eq!(message, "HTTP 502: <html>Bad Gateway</html>");
    }

    #[test]
    fn multipart_requests_are_flagged() {
        let upload = FileUpload {
            file_name: "notes.txt".to_string(),
            bytes: b"hello".to_vec(),
            purpose: "assistants".to_string(),
        };
        assert!(ApiRequest::post_multipart("files", upload).is_multipart());
        assert!(!ApiRequest::post_empty("threads").is_multipart());
    }
}
