use crate::types::events::ToolCallFragment;
use crate::types::tool::ToolCall;
use crate::utils::segmented::SegmentedBuffer;
use std::collections::HashMap;

/// A streamed tool call that cannot be turned into an invocable call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("tool call {id} at index {index} never received a function name")]
    MissingName { index: u32, id: String },

    #[error("tool call fragments at index {index} never received a call id")]
    OrphanFragment { index: u32 },
}

/// Collects tool call fragments (keyed by their stream index) into final ToolCall objects.
///
/// An index becomes a call once it has seen an id. Argument bytes are kept as
/// received; parsing happens at dispatch time.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    ids: HashMap<u32, String>,
    names: HashMap<u32, String>,
    arguments: HashMap<u32, SegmentedBuffer>,
    order: Vec<u32>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_fragment(&mut self, fragment: ToolCallFragment) {
        let index = fragment.index;
        if let Some(id) = fragment.id {
            if self.ids.insert(index, id).is_none() {
                self.order.push(index);
            }
        }
        if let Some(name) = fragment.name {
            self.names.insert(index, name);
        }
        if let Some(delta) = fragment.arguments {
            if !delta.is_empty() {
                self.arguments.entry(index).or_default().append(delta);
            }
        }
    }

    pub fn extend(&mut self, fragments: impl IntoIterator<Item = ToolCallFragment>) {
        for fragment in fragments {
            self.on_fragment(fragment);
        }
    }

    /// True when no call has been started.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.names.is_empty() && self.arguments.is_empty()
    }

    pub fn finalize(mut self) -> Result<Vec<ToolCall>, AssemblyError> {
        let orphan = self
            .names
            .keys()
            .chain(self.arguments.keys())
            .filter(|index| !self.ids.contains_key(index))
            .min()
            .copied();
        if let Some(index) = orphan {
            return Err(AssemblyError::OrphanFragment { index });
        }

        let mut calls = Vec::with_capacity(self.order.len());
        for index in std::mem::take(&mut self.order) {
            let Some(id) = self.ids.remove(&index) else {
                continue;
            };
            let name = match self.names.remove(&index) {
                Some(name) => name,
                None => return Err(AssemblyError::MissingName { index, id }),
            };
            let arguments = self
                .arguments
                .remove(&index)
                .map(SegmentedBuffer::build)
                .unwrap_or_default();
            tracing::debug!(
                index,
                call_id = %id,
                tool = %name,
                argument_bytes = arguments.len(),
                "assembled tool call"
            );
            calls.push(ToolCall {
                id,
                name,
                arguments,
            });
        }
        Ok(calls)
    }
}
