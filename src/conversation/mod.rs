//! Multi-turn tool loop.
//!
//! # Conversation Orchestrator
//!
//! One run per user prompt:
//!
//! ```text
//! [system, user] ──► provider ──► finish reason?
//!                       ▲            │ stop / length ──► done
//!                       │            │ tool_calls
//!                       │            ▼
//!                       └── append assistant turn + one tool result per call
//! ```
//!
//! The history only ever grows. Tool calls from one assistant turn run one at a
//! time, in the order the model listed them, and their results are appended in
//! that same order. There is no cap on the number of round trips: a provider
//! that keeps asking for tools keeps the loop going.
//!
//! With [`Conversation::run_streaming`] the provider replies as a live stream;
//! content deltas are forwarded as they arrive and tool-call fragments are
//! reassembled with a [`ToolCallAssembler`] before dispatch. Dropping the
//! returned stream cancels the run at the next suspension point.

use crate::provider::{ChatOptions, ChatProvider, ChatRequest};
use crate::tools::ToolRegistry;
use crate::types::{Completion, FinishReason, Message, ToolCall, ToolDefinition};
use crate::utils::tool_call_assembler::ToolCallAssembler;
use crate::{BoxStream, Error, ErrorContext, Result};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Something the streaming loop reports to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// Text produced by the model, forwarded as soon as it is observed.
    ContentDelta(String),
    /// A tool finished; its result has been appended to the history.
    ToolResult {
        call_id: String,
        name: String,
        content: String,
    },
    /// The model produced its final answer. Always the last event of a run.
    Finished {
        reason: FinishReason,
        content: String,
        history: Vec<Message>,
    },
}

/// Result of a one-shot run.
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    /// The terminal (`stop` or `length`) completion.
    pub completion: Completion,
    /// Every turn, ending with the final assistant answer.
    pub history: Vec<Message>,
    /// Number of provider round trips.
    pub dispatches: usize,
}

impl ConversationOutcome {
    pub fn content(&self) -> &str {
        &self.completion.content
    }
}

/// Drives a provider and a tool registry through the tool-call loop.
///
/// The provider is reused for every turn and is only ever called sequentially.
/// The registry is shared read-only and can back any number of conversations.
#[derive(Clone)]
pub struct Conversation {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ToolRegistry>,
    options: ChatOptions,
}

impl Conversation {
    pub fn new(provider: Arc<dyn ChatProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Run one prompt with one-shot provider calls.
    pub async fn run(&self, system: &str, user: &str) -> Result<ConversationOutcome> {
        self.run_with_history(initial_history(system, user)).await
    }

    /// Continue an existing history (which should end with a user turn).
    pub async fn run_with_history(&self, mut history: Vec<Message>) -> Result<ConversationOutcome> {
        let tools: Vec<ToolDefinition> = self.registry.declarations().collect();
        let mut dispatches = 0usize;

        loop {
            dispatches += 1;
            debug!(
                turn = dispatches,
                history_len = history.len(),
                "dispatching conversation to provider"
            );
            let completion = self
                .provider
                .complete(ChatRequest::new(&history, &tools, &self.options))
                .await?;

            let reason = completion.finish_reason.clone();
            if reason.is_final_answer() {
                history.push(Message::assistant(completion.content.clone()));
                return Ok(ConversationOutcome {
                    completion,
                    history,
                    dispatches,
                });
            }
            if reason != FinishReason::ToolCalls {
                return Err(Error::UnexpectedFinish {
                    reason: reason.to_string(),
                });
            }
            if completion.tool_calls.is_empty() {
                return Err(tool_calls_missing(dispatches));
            }

            let outcomes = invoke_tools(&self.registry, &completion.tool_calls).await;
            history.push(Message::assistant_tool_calls(
                completion.content,
                completion.tool_calls,
            ));
            history.extend(outcomes.into_iter().map(ToolOutcome::into_message));
        }
    }

    /// Run one prompt against the provider's streaming endpoint.
    pub fn run_streaming(&self, system: &str, user: &str) -> BoxStream<'static, ConversationEvent> {
        self.run_streaming_with_history(initial_history(system, user))
    }

    pub fn run_streaming_with_history(
        &self,
        history: Vec<Message>,
    ) -> BoxStream<'static, ConversationEvent> {
        let provider = Arc::clone(&self.provider);
        let registry = Arc::clone(&self.registry);
        let options = self.options.clone();

        Box::pin(async_stream::stream! {
            let tools: Vec<ToolDefinition> = registry.declarations().collect();
            let mut history = history;
            let mut dispatches = 0usize;

            loop {
                dispatches += 1;
                debug!(
                    turn = dispatches,
                    history_len = history.len(),
                    "dispatching conversation to streaming provider"
                );
                let request = ChatRequest::new(&history, &tools, &options);
                let mut updates = match provider.complete_stream(request).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut content = String::new();
                let mut assembler = ToolCallAssembler::new();
                let mut finish_reason = None;
                while let Some(update) = updates.next().await {
                    let update = match update {
                        Ok(update) => update,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    for delta in update.content {
                        content.push_str(&delta);
                        yield Ok(ConversationEvent::ContentDelta(delta));
                    }
                    assembler.extend(update.tool_calls);
                    if let Some(reason) = update.finish_reason {
                        finish_reason = Some(reason);
                    }
                }

                let Some(reason) = finish_reason else {
                    yield Err(Error::runtime_with_context(
                        "stream ended without a finish reason",
                        ErrorContext::new()
                            .with_details(format!("turn {}", dispatches))
                            .with_source("conversation"),
                    ));
                    return;
                };

                if reason.is_final_answer() {
                    history.push(Message::assistant(content.clone()));
                    yield Ok(ConversationEvent::Finished {
                        reason,
                        content,
                        history,
                    });
                    return;
                }
                if reason != FinishReason::ToolCalls {
                    yield Err(Error::UnexpectedFinish {
                        reason: reason.to_string(),
                    });
                    return;
                }
                if assembler.is_empty() {
                    yield Err(tool_calls_missing(dispatches));
                    return;
                }

                let calls = match assembler.finalize() {
                    Ok(calls) => calls,
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    }
                };
                let outcomes = invoke_tools(&registry, &calls).await;
                history.push(Message::assistant_tool_calls(content, calls));
                for outcome in outcomes {
                    history.push(Message::tool_result(
                        outcome.call_id.clone(),
                        outcome.content.clone(),
                    ));
                    yield Ok(ConversationEvent::ToolResult {
                        call_id: outcome.call_id,
                        name: outcome.name,
                        content: outcome.content,
                    });
                }
            }
        })
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn initial_history(system: &str, user: &str) -> Vec<Message> {
    vec![Message::system(system), Message::user(user)]
}

struct ToolOutcome {
    call_id: String,
    name: String,
    content: String,
}

impl ToolOutcome {
    fn into_message(self) -> Message {
        Message::tool_result(self.call_id, self.content)
    }
}

fn tool_calls_missing(turn: usize) -> Error {
    warn!(turn, "provider finished with tool_calls but sent none");
    Error::runtime_with_context(
        "tool_calls finish without calls",
        ErrorContext::new()
            .with_field_path("tool_calls")
            .with_details(format!("turn {}", turn))
            .with_source("conversation"),
    )
}

/// Run the requested calls one after another, in request order.
async fn invoke_tools(registry: &ToolRegistry, calls: &[ToolCall]) -> Vec<ToolOutcome> {
    let mut outcomes = Vec::with_capacity(calls.len());
    for call in calls {
        info!(call_id = %call.id, tool = %call.name, "invoking tool");
        let content = registry.invoke_call(call).await;
        outcomes.push(ToolOutcome {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        });
    }
    outcomes
}

#[cfg(test)]
mod tests;
