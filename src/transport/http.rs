use crate::config::ClientConfig;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{Response, StatusCode};
use std::env;
use std::time::Duration;

/// HTTP client bound to one endpoint and API key; reused across every turn of a conversation.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(
                env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, path: &str, body: &serde_json::Value, stream: bool) -> Result<Response> {
        let mut req = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body);
        if stream {
            req = req.header("accept", "text/event-stream");
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        Self::check_status(resp).await
    }

    async fn check_status(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Remote {
            status: status.as_u16(),
            message: remote_message(status, &body),
        })
    }

    /// POST a JSON body and decode the JSON reply.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let resp = self.send(path, body, false).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a JSON body and return the raw response byte stream.
    pub async fn post_stream(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<BoxStream<'static, Bytes>> {
        let resp = self.send(path, body, true).await?;
        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }
}

/// Pull `error.message` out of an OpenAI-style error body, falling back to the raw text.
fn remote_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_prefers_error_field() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            remote_message(StatusCode::UNAUTHORIZED, body),
            "Incorrect API key provided"
        );
        assert_eq!(remote_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(remote_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
