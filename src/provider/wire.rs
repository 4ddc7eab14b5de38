//! OpenAI chat-completions JSON envelopes.

use crate::types::{
    Completion, FinishReason, Message, StreamingUpdate, ToolCall, ToolCallFragment, ToolDefinition,
};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        let tool_call_id = match msg {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
            _ => None,
        };
        WireMessage {
            role: msg.role().as_str(),
            content: msg.text(),
            tool_calls: msg.tool_calls().iter().map(WireToolCall::from).collect(),
            tool_call_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        WireToolCall {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string_lossy(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub choices: Vec<WireChoice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    pub message: WireResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

impl WireResponse {
    pub fn into_completion(self) -> Result<Completion> {
        let usage = self.usage;
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            Error::runtime_with_context(
                "response contained no choices",
                ErrorContext::new()
                    .with_field_path("choices")
                    .with_source("openai_provider"),
            )
        })?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        let finish_reason = match choice.finish_reason.as_deref() {
            Some(reason) => FinishReason::from(reason),
            None if !tool_calls.is_empty() => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };

        Ok(Completion {
            finish_reason,
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChunk {
    #[serde(default)]
    pub choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChunkChoice {
    #[serde(default)]
    pub delta: Option<WireDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl WireChunk {
    /// Only the first choice is read; requests never ask for more than one.
    pub fn into_update(self) -> StreamingUpdate {
        let Some(choice) = self.choices.into_iter().next() else {
            return StreamingUpdate::default();
        };
        let delta = choice.delta.unwrap_or_default();

        let content = delta.content.filter(|c| !c.is_empty()).into_iter().collect();
        let tool_calls = delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                ToolCallFragment {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments: arguments.map(Bytes::from),
                }
            })
            .collect();

        StreamingUpdate {
            content,
            tool_calls,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from),
        }
    }
}
