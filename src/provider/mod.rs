//! Chat-completion providers.
//!
//! The orchestrator only sees [`ChatProvider`]: send the conversation and the
//! tool declarations, get back either one [`Completion`] or a live stream of
//! [`StreamingUpdate`]s. Wire formats stay inside the implementations.

pub mod openai;
pub mod sse;
mod wire;

pub use openai::OpenAiProvider;

use crate::types::{Completion, Message, StreamingUpdate, ToolCallFragment, ToolDefinition};
use crate::{BoxStream, Result};
use async_trait::async_trait;

/// Per-request generation knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// OpenAI-style `tool_choice`; left to the provider default when unset.
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatOptions {
    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn tool_choice(mut self, tool_choice: serde_json::Value) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }
}

/// Everything a provider needs for one dispatch. Borrowed from the caller's history.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub options: &'a ChatOptions,
}

impl<'a> ChatRequest<'a> {
    pub fn new(
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        options: &'a ChatOptions,
    ) -> Self {
        Self {
            messages,
            tools,
            options,
        }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// One-shot completion.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Completion>;

    /// Live completion. The last update carries the finish reason.
    ///
    /// The default replays [`complete`](Self::complete) as a short update sequence,
    /// for providers without a streaming endpoint.
    async fn complete_stream(
        &self,
        request: ChatRequest<'_>,
    ) -> Result<BoxStream<'static, StreamingUpdate>> {
        let completion = self.complete(request).await?;
        let updates = completion_to_updates(completion);
        Ok(Box::pin(futures::stream::iter(updates.into_iter().map(Ok))))
    }
}

/// Split a completion into the updates a streaming provider would have sent.
pub fn completion_to_updates(completion: Completion) -> Vec<StreamingUpdate> {
    let mut updates = Vec::new();
    if !completion.content.is_empty() {
        updates.push(StreamingUpdate::content(completion.content));
    }
    for (index, call) in completion.tool_calls.into_iter().enumerate() {
        let mut fragment = ToolCallFragment::new(index as u32)
            .with_id(call.id)
            .with_name(call.name);
        if !call.arguments.is_empty() {
            fragment = fragment.with_arguments(call.arguments.to_bytes());
        }
        updates.push(StreamingUpdate::tool_call(fragment));
    }
    updates.push(StreamingUpdate::finished(completion.finish_reason));
    updates
}
