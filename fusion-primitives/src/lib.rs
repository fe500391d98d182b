//! Core shared types for the tool-fusion runtime.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod framework;
mod kind;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Wire convention spoken by the LLM provider.
pub use framework::Framework;
/// Execution kind of a registered tool.
pub use kind::ToolKind;
