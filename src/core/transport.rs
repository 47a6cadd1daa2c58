use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::api::{ChatCompletion, ChatRequest};
use crate::core::error::ChatError;
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

/// Raw response body of a streamed completion.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ChatError>> + Send>>;

/// Issues chat-completion requests against a provider.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a request and wait for the whole completion body.
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError>;

    /// Send a request and hand back the live response body.
    async fn stream(&self, request: ChatRequest) -> Result<ByteStream, ChatError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        construct_api_url(&self.base_url, "chat/completions")
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ChatError> {
        let url = self.endpoint();
        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "Sending chat completion request"
        );

        let http_request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        let http_request = add_auth_headers(http_request, &self.api_key);

        let response = http_request.json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: format_api_error(&error_text),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError> {
        let response = self.post(&request).await?;
        response
            .json::<ChatCompletion>()
            .await
            .map_err(|err| ChatError::InvalidResponse(err.to_string()))
    }

    async fn stream(&self, request: ChatRequest) -> Result<ByteStream, ChatError> {
        let response = self.post(&request).await?;
        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| ChatError::Stream(err.to_string()))
        });
        Ok(Box::pin(body))
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Render an error body returned by a provider as a short readable summary.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        return format!("API Error: {json_value}");
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("API Error: {collapsed}")
}
