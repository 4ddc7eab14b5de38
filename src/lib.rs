//! # ai-tool-chat
//!
//! Tool-calling chat client for OpenAI-compatible chat-completion endpoints.
//!
//! ## Overview
//!
//! A conversation starts from a system prompt and a user prompt. The model may
//! answer directly or ask for one or more tools to be run; the crate runs them,
//! feeds the results back, and repeats until the model produces a final answer.
//! Responses can be consumed one-shot or as a live stream, in which case
//! tool-call fragments are reassembled from partial updates before dispatch.
//!
//! ## Core Philosophy
//!
//! - **Provider-Agnostic Loop**: the orchestrator only sees [`provider::ChatProvider`];
//!   wire formats stay inside provider implementations
//! - **Streaming-First**: content deltas are forwarded as soon as they arrive
//! - **Cheap Accumulation**: streamed argument fragments are kept as shared
//!   segments and only flattened if a consumer asks for contiguous bytes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_tool_chat::{ClientConfig, Conversation, OpenAiProvider, ToolRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ai_tool_chat::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let provider = Arc::new(OpenAiProvider::new(&config)?);
//!     let registry = Arc::new(ToolRegistry::with_builtin_tools());
//!
//!     let conversation = Conversation::new(provider, registry);
//!     let outcome = conversation
//!         .run(&config.system_prompt, "Whose birthday is on 2024-03-10?")
//!         .await?;
//!     println!("{}", outcome.content());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`conversation`] | Multi-turn tool loop, one-shot and streaming |
//! | [`blocking`] | Synchronous wrapper around [`conversation`] |
//! | [`provider`] | Provider trait and the OpenAI-compatible implementation |
//! | [`tools`] | Tool handler trait, registry and built-in tools |
//! | [`types`] | Messages, tool calls, completions and streaming updates |
//! | [`utils`] | Segmented byte buffer and streamed tool-call assembly |
//! | [`transport`] | HTTP transport |
//! | [`config`] | Client configuration |

pub mod blocking;
pub mod config;
pub mod conversation;
pub mod provider;
pub mod tools;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use conversation::{Conversation, ConversationEvent, ConversationOutcome};
pub use provider::{openai::OpenAiProvider, ChatOptions, ChatProvider, ChatRequest};
pub use tools::{ToolHandler, ToolRegistry};
pub use types::{
    completion::{Completion, FinishReason},
    events::{StreamingUpdate, ToolCallFragment},
    message::{Message, MessageRole},
    tool::{ToolCall, ToolDefinition},
};
pub use utils::{SegmentedBuffer, SegmentedBytes, ToolCallAssembler};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
