//! Tool registry.

use super::ToolHandler;
use crate::types::tool::{ToolCall, ToolDefinition};
use crate::utils::segmented::SegmentedBytes;
use bytes::Buf;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Name → handler mapping, built once and read-only afterwards.
///
/// Names are compared case-insensitively. Registering a second handler under a
/// colliding name replaces the first one in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(handlers: impl IntoIterator<Item = Arc<dyn ToolHandler>>) -> Self {
        let mut registry = Self::default();
        for handler in handlers {
            let key = normalize(handler.name());
            match registry.index.get(&key) {
                Some(&slot) => {
                    tracing::warn!(
                        tool = handler.name(),
                        replaced = registry.handlers[slot].name(),
                        "tool name collision, later registration wins"
                    );
                    registry.handlers[slot] = handler;
                }
                None => {
                    registry.index.insert(key, registry.handlers.len());
                    registry.handlers.push(handler);
                }
            }
        }
        registry
    }

    /// Registry holding the bundled clock and birthday tools.
    pub fn with_builtin_tools() -> Self {
        Self::new([
            Arc::new(super::CurrentDateTimeTool::new()) as Arc<dyn ToolHandler>,
            Arc::new(super::BirthdayLookupTool::new()),
        ])
    }

    /// Declarations for every registered tool, in registration order.
    pub fn declarations(&self) -> impl Iterator<Item = ToolDefinition> + '_ {
        self.handlers.iter().map(|h| {
            ToolDefinition::function(h.name(), h.description(), h.parameters_schema())
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.index
            .get(&normalize(name))
            .map(|&slot| &self.handlers[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&normalize(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.name())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke a tool by name. Unknown names yield a "not registered" message
    /// instead of an error so the conversation can continue.
    pub async fn invoke(&self, name: &str, parameters: Value) -> String {
        match self.get(name) {
            Some(handler) => handler.invoke(parameters).await,
            None => {
                tracing::warn!(tool = name, "model requested an unregistered tool");
                format!("Tool \"{}\" is not registered.", name)
            }
        }
    }

    /// Invoke a requested call, parsing its raw argument payload first.
    pub async fn invoke_call(&self, call: &ToolCall) -> String {
        let parameters = parse_arguments(&call.arguments);
        self.invoke(&call.name, parameters).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Parse a raw argument payload.
///
/// Empty payloads mean "no arguments" (`{}`); payloads that are not valid JSON
/// are passed through as a JSON string so the handler can report the problem.
pub fn parse_arguments(raw: &SegmentedBytes) -> Value {
    if raw.is_empty() {
        return Value::Object(Default::default());
    }
    match serde_json::from_reader::<_, Value>(raw.cursor().reader()) {
        Ok(v) => v,
        Err(e) => {
            let text = raw.to_string_lossy();
            if text.trim().is_empty() {
                return Value::Object(Default::default());
            }
            tracing::warn!(error = %e, "tool arguments are not valid JSON");
            Value::String(text)
        }
    }
}
