//! Tool registration and tool-call orchestration for chat LLMs.
//!
//! Depend on this crate via `cargo add tool-fusion`. It bundles the workspace
//! crates behind feature flags:
//!
//! - `tools`: [`ToolRegistry`](tools::ToolRegistry), schema extraction and the
//!   `#[tool]` attribute.
//! - `adapters`: the OpenAI-style and Ollama-style wire adapters.
//! - `kernel`: the dispatch loop and parallel poller.
//! - `telemetry`: tracing setup and timing helpers.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use fusion_primitives as primitives;

/// Tool registration and schema extraction (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use fusion_tools as tools;

/// Wire adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use fusion_adapters as adapters;

/// Dispatch engine (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use fusion_kernel as kernel;

/// Tracing setup and timing (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use fusion_telemetry as telemetry;

/// Commonly used items.
#[cfg(feature = "kernel")]
pub mod prelude {
    pub use fusion_adapters::{ChatMessage, MessageRole};
    pub use fusion_kernel::{
        BlockingLlmClient, Completion, DispatchConfig, LlmClient, LlmResult, ToolDispatcher,
    };
    pub use fusion_primitives::{Framework, ToolKind};
    pub use fusion_tools::{ToolDefinition, ToolError, ToolFunction, ToolRegistry, ToolResult};
}
