//! Tool registration and schema derivation.
//!
//! Tools are plain Rust functions wrapped in a [`ToolFunction`]. Their
//! documentation comments are parsed into the JSON schema the LLM receives, and
//! the [`ToolRegistry`] keeps them partitioned into blocking and asynchronous
//! sets for the dispatch engine.

#![warn(missing_docs, clippy::pedantic)]

pub mod arguments;
pub mod function;
pub mod output;
pub mod registry;
pub mod schema;

pub use function::{BlockingTool, Tool, ToolBody, ToolError, ToolFunction, ToolFuture, ToolResult};
pub use fusion_primitives::{Framework, ToolKind};
pub use fusion_tools_macros::tool;
pub use registry::{RegistrationError, ToolRegistry};
pub use schema::{ParameterSpec, Properties, ToolDefinition, ToolDocumentation, ToolSchema, describe, extract};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
}
