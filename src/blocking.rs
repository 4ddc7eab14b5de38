//! Synchronous conversation API.
//!
//! Wraps [`crate::conversation::Conversation`] with a private current-thread
//! Tokio runtime. Like other blocking clients, it must not be used from inside
//! an async context: `block_on` panics when called on a runtime thread.

use crate::conversation::{self, ConversationEvent, ConversationOutcome};
use crate::provider::{ChatOptions, ChatProvider};
use crate::tools::ToolRegistry;
use crate::types::Message;
use crate::{BoxStream, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

pub struct Conversation {
    inner: conversation::Conversation,
    runtime: Runtime,
}

impl Conversation {
    pub fn new(provider: Arc<dyn ChatProvider>, registry: Arc<ToolRegistry>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner: conversation::Conversation::new(provider, registry),
            runtime,
        })
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    pub fn run(&self, system: &str, user: &str) -> Result<ConversationOutcome> {
        self.runtime.block_on(self.inner.run(system, user))
    }

    pub fn run_with_history(&self, history: Vec<Message>) -> Result<ConversationOutcome> {
        self.runtime.block_on(self.inner.run_with_history(history))
    }

    /// Events of a streaming run, pulled one at a time.
    ///
    /// Dropping the iterator abandons the run.
    pub fn run_streaming(&self, system: &str, user: &str) -> Events<'_> {
        Events {
            runtime: &self.runtime,
            stream: self.inner.run_streaming(system, user),
        }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::Conversation")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Blocking iterator over [`ConversationEvent`]s.
pub struct Events<'a> {
    runtime: &'a Runtime,
    stream: BoxStream<'static, ConversationEvent>,
}

impl Iterator for Events<'_> {
    type Item = Result<ConversationEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}
