//! Wire adapters for the supported tool-calling conventions.
//!
//! Each module implements the shared [`traits::WireAdapter`] interface for one
//! provider layout so the dispatch engine never inspects responses directly.

#![warn(missing_docs, clippy::pedantic)]

pub mod ollama;
pub mod openai;
pub mod traits;

pub use fusion_primitives::Framework;
pub use traits::{
    AdapterError, AdapterResult, ChatMessage, FunctionCall, InvocationRequest, MessageRole,
    ToolCall, WireAdapter, wire_adapter,
};
