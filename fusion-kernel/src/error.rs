//! Errors surfaced to the orchestration caller.

use thiserror::Error;

/// Boxed error returned by LLM clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures that abort a dispatch call.
///
/// Tool failures never appear here; they are reported to the LLM as the
/// tool's result instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The caller-supplied LLM client failed.
    #[error("LLM invocation failed after {round} tool round(s): {source}")]
    Llm {
        /// Number of tool rounds completed before the failure.
        round: usize,
        /// Error returned by the client.
        #[source]
        source: BoxError,
    },
}
