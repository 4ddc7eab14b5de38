//! Core data types: conversation turns, tool declarations and calls, provider
//! responses.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | One conversation turn (system, user, assistant, tool result) |
//! | [`ToolDefinition`] | Tool declaration advertised to the provider |
//! | [`ToolCall`] | Invocation requested by the model |
//! | [`Completion`] | One terminal provider response |
//! | [`StreamingUpdate`] | One incremental update of a live response |
//!
//! ## Example
//!
//! ```rust
//! use ai_tool_chat::types::{Message, ToolDefinition};
//!
//! let history = vec![
//!     Message::system("You are a helpful assistant"),
//!     Message::user("What day is it?"),
//! ];
//!
//! let tool = ToolDefinition::function(
//!     "GetCurrentDateTime",
//!     "Returns the current local date and time",
//!     serde_json::json!({"type": "object", "properties": {}}),
//! );
//! assert_eq!(tool.name(), "GetCurrentDateTime");
//! # let _ = history;
//! ```

pub mod completion;
pub mod events;
pub mod message;
pub mod tool;

pub use completion::{Completion, FinishReason};
pub use events::{StreamingUpdate, ToolCallFragment};
pub use message::{Message, MessageRole};
pub use tool::{FunctionDefinition, ToolCall, ToolDefinition};
