//! Tool-call orchestration.
//!
//! The [`ToolDispatcher`] consumes an LLM response, executes the tool
//! invocations it requests, appends the results to the conversation and
//! re-queries the LLM until it answers without requesting tools. Two surfaces
//! share one state machine: [`ToolDispatcher::process_tool_calls`] awaits tools
//! on the caller's runtime, while
//! [`ToolDispatcher::process_tool_calls_blocking`] drives them on an owned
//! [`BlockingExecutor`].

#![warn(missing_docs, clippy::pedantic)]

mod client;
mod config;
pub mod dispatch;
mod error;
mod executor;
mod invocation;
pub mod poller;

pub use client::{BlockingLlmClient, LlmClient, LlmResult};
pub use config::{DEFAULT_MAX_CHAINED_CALLS, DispatchConfig};
pub use dispatch::{
    CHAIN_LIMIT_DIRECTIVE, Completion, ToolDispatcher, process_tool_calls,
    process_tool_calls_blocking,
};
pub use error::{BoxError, DispatchError, DispatchResult};
pub use executor::{BlockingExecutor, ExecutorError, ExecutorResult};
pub use poller::poll_async;
