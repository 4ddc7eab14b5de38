//! Streaming helpers: byte accumulation and tool-call reassembly.

pub mod segmented;
pub mod tool_call_assembler;

pub use segmented::{SegmentedBuffer, SegmentedBytes};
pub use tool_call_assembler::{AssemblyError, ToolCallAssembler};
