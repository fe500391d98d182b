//! Resolution and execution of a single tool invocation.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use fusion_adapters::{AdapterError, ChatMessage, InvocationRequest, WireAdapter};
use fusion_tools::{BlockingTool, Tool, ToolBody, ToolError, ToolFunction, ToolResult};
use futures::FutureExt;
use serde_json::Value;
use tracing::warn;

/// A tool body paired with its decoded arguments.
pub(crate) enum Resolved {
    Blocking(Arc<dyn BlockingTool>, Value),
    Async(Arc<dyn Tool>, Value),
}

/// Looks up the callable for `invocation` and decodes its arguments.
pub(crate) fn resolve(
    adapter: &dyn WireAdapter,
    callables: &HashMap<String, ToolFunction>,
    invocation: &InvocationRequest,
) -> ToolResult<Resolved> {
    let function = callables
        .get(&invocation.name)
        .ok_or_else(|| ToolError::UnknownTool {
            name: invocation.name.clone(),
        })?;

    let arguments = adapter
        .decode_arguments(&invocation.arguments)
        .map_err(|err| match err {
            AdapterError::InvalidArguments { reason } => ToolError::InvalidArguments { reason },
            other => ToolError::invalid_arguments(other.to_string()),
        })?;

    Ok(match function.body() {
        ToolBody::Blocking(tool) => Resolved::Blocking(Arc::clone(tool), arguments),
        ToolBody::Async(tool) => Resolved::Async(Arc::clone(tool), arguments),
    })
}

/// Runs a blocking body, converting a panic into [`ToolError::Panicked`].
pub(crate) fn call_blocking(tool: &dyn BlockingTool, arguments: Value) -> ToolResult<Value> {
    catch_unwind(AssertUnwindSafe(|| tool.call(arguments)))
        .unwrap_or_else(|payload| Err(panicked(payload.as_ref())))
}

/// Awaits an asynchronous body, converting a panic into [`ToolError::Panicked`].
pub(crate) async fn call_async(tool: Arc<dyn Tool>, arguments: Value) -> ToolResult<Value> {
    AssertUnwindSafe(tool.invoke(arguments))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panicked(payload.as_ref())))
}

/// Runs whichever body `resolved` carries on the current task.
pub(crate) async fn call(resolved: ToolResult<Resolved>) -> ToolResult<Value> {
    match resolved? {
        Resolved::Blocking(tool, arguments) => call_blocking(tool.as_ref(), arguments),
        Resolved::Async(tool, arguments) => call_async(tool, arguments).await,
    }
}

/// Text delivered to the LLM in place of a failed tool's result.
pub(crate) fn error_content(name: &str, err: &ToolError) -> String {
    format!("Error executing tool '{name}': {err}")
}

/// Builds the tool-role message answering `invocation`.
pub(crate) fn tool_message(
    adapter: &dyn WireAdapter,
    invocation: &InvocationRequest,
    outcome: ToolResult<Value>,
) -> ChatMessage {
    let content = match outcome {
        Ok(output) => adapter.encode_result(&output),
        Err(err) => {
            warn!(tool = %invocation.name, error = %err, "tool invocation failed");
            error_content(&invocation.name, &err)
        }
    };
    adapter.tool_message(invocation, content)
}

fn panicked(payload: &(dyn Any + Send)) -> ToolError {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    ToolError::Panicked { reason }
}
