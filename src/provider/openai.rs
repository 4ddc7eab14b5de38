//! OpenAI-compatible chat-completions provider.

use super::wire::{WireChunk, WireMessage, WireRequest, WireResponse};
use super::{sse, ChatProvider, ChatRequest};
use crate::config::ClientConfig;
use crate::transport::HttpTransport;
use crate::types::{Completion, StreamingUpdate};
use crate::{BoxStream, Result};
use async_trait::async_trait;
use futures::TryStreamExt;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Talks to `<base_url>/chat/completions`.
pub struct OpenAiProvider {
    transport: HttpTransport,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body(&self, request: &ChatRequest<'_>, stream: bool) -> Result<serde_json::Value> {
        let wire = WireRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools,
            tool_choice: if request.tools.is_empty() {
                None
            } else {
                request.options.tool_choice.as_ref()
            },
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream,
        };
        Ok(serde_json::to_value(&wire)?)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Completion> {
        let body = self.body(&request, false)?;
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );
        let raw = self.transport.post_json(CHAT_COMPLETIONS_PATH, &body).await?;
        let response: WireResponse = serde_json::from_value(raw)?;
        response.into_completion()
    }

    async fn complete_stream(
        &self,
        request: ChatRequest<'_>,
    ) -> Result<BoxStream<'static, StreamingUpdate>> {
        let body = self.body(&request, true)?;
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending streaming chat completion request"
        );
        let bytes = self
            .transport
            .post_stream(CHAT_COMPLETIONS_PATH, &body)
            .await?;

        let updates = sse::decode(bytes)
            .and_then(|frame| async move {
                let chunk: WireChunk = serde_json::from_value(frame)?;
                Ok::<_, crate::Error>(chunk.into_update())
            })
            .try_filter(|update| futures::future::ready(!update.is_empty()));
        Ok(Box::pin(updates))
    }
}
