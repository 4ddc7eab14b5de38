//! Incremental updates delivered by a streaming provider

use crate::types::completion::FinishReason;
use bytes::Bytes;

/// One piece of a streamed tool call.
///
/// `index` is stable for the whole call; the remaining fields show up on
/// whichever update happens to carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<Bytes>,
}

impl ToolCallFragment {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, delta: impl Into<Bytes>) -> Self {
        self.arguments = Some(delta.into());
        self
    }
}

/// One update of a live response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingUpdate {
    pub content: Vec<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    /// Present only on the last update of a response.
    pub finish_reason: Option<FinishReason>,
}

impl StreamingUpdate {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn tool_call(fragment: ToolCallFragment) -> Self {
        Self {
            tool_calls: vec![fragment],
            ..Self::default()
        }
    }

    pub fn finished(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_calls.is_empty() && self.finish_reason.is_none()
    }
}
