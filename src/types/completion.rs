//! Terminal responses and finish reasons

use crate::types::tool::ToolCall;
use std::fmt;
use std::str::FromStr;

/// Why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(s) => s,
        }
    }

    /// `stop` or `length`: the model produced its final answer.
    pub fn is_final_answer(&self) -> bool {
        matches!(self, FinishReason::Stop | FinishReason::Length)
    }
}

impl FromStr for FinishReason {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "stop" | "end_turn" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "tool_calls" | "function_call" | "tool_use" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        })
    }
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(reason) => reason,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One full model response.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub finish_reason: FinishReason,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<serde_json::Value>,
}

impl Completion {
    pub fn new(finish_reason: FinishReason, content: impl Into<String>) -> Self {
        Self {
            finish_reason,
            content: content.into(),
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    pub fn stop(content: impl Into<String>) -> Self {
        Self::new(FinishReason::Stop, content)
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            finish_reason: FinishReason::ToolCalls,
            content: String::new(),
            tool_calls,
            usage: None,
        }
    }
}
