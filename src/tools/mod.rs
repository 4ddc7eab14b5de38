//! Local tools the model may call.
//!
//! Each tool implements [`ToolHandler`]; a [`ToolRegistry`] collects them,
//! advertises their declarations to the provider and dispatches calls by name.

pub mod builtin;
pub mod registry;

pub use builtin::{BirthdayLookupTool, CurrentDateTimeTool};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

/// A locally executed function exposed to the model.
///
/// Handlers never fail: problems (missing or malformed parameters, lookups
/// that find nothing) are reported in the returned text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name the model calls the tool by. Matched case-insensitively.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the parameters object.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, parameters: Value) -> String;
}
