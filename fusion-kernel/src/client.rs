//! LLM client seams.

use async_trait::async_trait;
use fusion_adapters::ChatMessage;
use fusion_tools::ToolDefinition;
use serde_json::Value;

use crate::error::BoxError;

/// Result returned by LLM clients: the provider's JSON response body.
pub type LlmResult = Result<Value, BoxError>;

/// Asynchronous LLM invocation function.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the conversation and tool schemas to `model`.
    ///
    /// # Errors
    ///
    /// Returns the client's transport or provider error.
    async fn call(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> LlmResult;
}

/// Blocking LLM invocation function.
///
/// Implemented for closures `Fn(&str, &[ChatMessage], &[ToolDefinition]) -> LlmResult`.
pub trait BlockingLlmClient {
    /// Sends the conversation and tool schemas to `model`.
    ///
    /// # Errors
    ///
    /// Returns the client's transport or provider error.
    fn call(&self, model: &str, messages: &[ChatMessage], tools: &[ToolDefinition])
    -> LlmResult;
}

impl<F> BlockingLlmClient for F
where
    F: Fn(&str, &[ChatMessage], &[ToolDefinition]) -> LlmResult,
{
    fn call(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> LlmResult {
        (self)(model, messages, tools)
    }
}
