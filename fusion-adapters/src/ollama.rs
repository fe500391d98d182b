//! Ollama-style chat response layout.
//!
//! Invocations live under `message.tool_calls` with already-decoded argument
//! objects. The response message is appended to the conversation verbatim and
//! tool results are sent back as plain text keyed by tool name.

use fusion_primitives::Framework;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::traits::{
    AdapterError, AdapterResult, ChatMessage, InvocationRequest, MessageRole, WireAdapter,
};

/// Chat response body.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatReply {
    /// Model that produced the reply.
    #[serde(default)]
    pub model: Option<String>,
    /// Assistant message.
    #[serde(default)]
    pub message: Option<ChatMessage>,
    /// Whether generation finished.
    #[serde(default)]
    pub done: bool,
}

/// Adapter for Ollama-style responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct OllamaWire;

impl OllamaWire {
    fn message(response: &Value) -> Option<ChatMessage> {
        match ChatReply::deserialize(response) {
            Ok(reply) => reply.message,
            Err(err) => {
                let err = AdapterError::MalformedResponse {
                    framework: Framework::Ollama,
                    reason: err.to_string(),
                };
                warn!(error = %err, "treating response as carrying no tool calls");
                None
            }
        }
    }
}

impl WireAdapter for OllamaWire {
    fn framework(&self) -> Framework {
        Framework::Ollama
    }

    fn invocations(&self, response: &Value) -> Vec<InvocationRequest> {
        Self::message(response)
            .map(|message| message.tool_calls.iter().map(InvocationRequest::from).collect())
            .unwrap_or_default()
    }

    fn text_content(&self, response: &Value) -> Option<String> {
        Self::message(response).map(|message| message.content.unwrap_or_default())
    }

    fn append_assistant_turn(&self, conversation: &mut Vec<ChatMessage>, response: &Value) {
        if let Some(message) = Self::message(response) {
            conversation.push(message);
        }
    }

    fn decode_arguments(&self, arguments: &Value) -> AdapterResult<Value> {
        match arguments {
            Value::Object(_) => Ok(arguments.clone()),
            Value::Null => Ok(Value::Object(Map::new())),
            Value::String(raw) => serde_json::from_str(raw)
                .map_err(|err| AdapterError::invalid_arguments(err.to_string())),
            other => Err(AdapterError::invalid_arguments(format!(
                "expected an argument object, found `{other}`"
            ))),
        }
    }

    fn encode_result(&self, output: &Value) -> String {
        match output {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn tool_message(&self, invocation: &InvocationRequest, content: String) -> ChatMessage {
        ChatMessage {
            name: Some(invocation.name.clone()),
            ..ChatMessage::new(MessageRole::Tool, content)
        }
    }
}
