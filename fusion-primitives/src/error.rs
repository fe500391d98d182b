//! Shared error definitions for tool-fusion primitives.

use thiserror::Error;

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while registering tools.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested tool kind is not one of `sync` or `async`.
    #[error("invalid tool kind `{kind}`: expected `sync` or `async`")]
    InvalidKind {
        /// The offending kind string.
        kind: String,
    },

    /// The declared kind contradicts the body of the callable.
    #[error("tool `{name}` cannot be registered as {declared}: its body is {actual}")]
    KindMismatch {
        /// Name of the offending tool.
        name: String,
        /// Kind requested at registration time.
        declared: crate::ToolKind,
        /// Kind implied by the callable body.
        actual: crate::ToolKind,
    },

    /// Tool name failed validation.
    #[error("invalid tool name `{name}`: {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The framework tag is not a supported wire convention.
    #[error("unsupported framework `{framework}`: expected `openai` or `ollama`")]
    UnsupportedFramework {
        /// The offending framework string.
        framework: String,
    },
}
