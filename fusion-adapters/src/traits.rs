//! Shared chat message model and the wire adapter interface.

use std::fmt;

use fusion_primitives::Framework;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ollama::OllamaWire;
use crate::openai::OpenAiWire;

/// Result alias used by wire adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type shared by adapter implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Invocation arguments could not be decoded.
    #[error("invalid tool arguments: {reason}")]
    InvalidArguments {
        /// Decoder error message.
        reason: String,
    },

    /// The provider returned a response that does not match the wire shape.
    #[error("malformed {framework} response: {reason}")]
    MalformedResponse {
        /// Wire shape the response was read as.
        framework: Framework,
        /// Decoder error message.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for argument decoding failures.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}

/// Roles supported in chat-style conversations.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System messages steer the assistant behaviour.
    System,
    /// User-authored content.
    User,
    /// Assistant (model) responses.
    Assistant,
    /// Tool results returned to the model.
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        })
    }
}

/// Function part of a tool call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the requested tool.
    pub name: String,
    /// Raw arguments: a JSON string (OpenAI) or an object (Ollama).
    #[serde(default)]
    pub arguments: Value,
    /// Provider-specific fields such as `index`, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool call attached to an assistant message.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolCall {
    /// Correlation id (OpenAI only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Call type, `"function"` when present.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Requested function.
    pub function: FunctionCall,
    /// Provider-specific fields preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry of the conversation exchanged with the LLM.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: MessageRole,
    /// Textual content. Absent and `null` both read as `None`; an array of
    /// content parts reads as the concatenation of their `text` fields.
    #[serde(default, deserialize_with = "content_text", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the assistant.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlation id of the call a tool message answers (OpenAI only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on tool messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider-specific fields preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// Creates a message with the given role and content.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Returns the textual content, empty when the message carries none.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Attaches tool calls.
    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn content_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(parts)) => Some(
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect(),
        ),
        Some(other) => Some(other.to_string()),
    })
}

/// A single tool invocation requested by the LLM.
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationRequest {
    /// Correlation id (OpenAI only).
    pub id: Option<String>,
    /// Requested tool name.
    pub name: String,
    /// Arguments exactly as received.
    pub arguments: Value,
}

impl From<&ToolCall> for InvocationRequest {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        }
    }
}

/// Reads and writes one provider's tool-calling layout.
pub trait WireAdapter: Send + Sync {
    /// Returns the framework tag this adapter implements.
    fn framework(&self) -> Framework;

    /// Returns the invocations requested by `response`, in order.
    fn invocations(&self, response: &Value) -> Vec<InvocationRequest>;

    /// Returns `true` when `response` requests at least one invocation.
    fn has_invocations(&self, response: &Value) -> bool {
        !self.invocations(response).is_empty()
    }

    /// Returns the textual content of `response`.
    fn text_content(&self, response: &Value) -> Option<String>;

    /// Appends the assistant turn carried by `response` to the conversation.
    fn append_assistant_turn(&self, conversation: &mut Vec<ChatMessage>, response: &Value);

    /// Decodes raw invocation arguments into a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidArguments`] when the payload cannot be
    /// decoded.
    fn decode_arguments(&self, arguments: &Value) -> AdapterResult<Value>;

    /// Encodes a tool's output as message content.
    fn encode_result(&self, output: &Value) -> String;

    /// Builds the tool-role message answering `invocation`.
    fn tool_message(&self, invocation: &InvocationRequest, content: String) -> ChatMessage;
}

/// Returns the adapter for `framework`.
#[must_use]
pub fn wire_adapter(framework: Framework) -> &'static dyn WireAdapter {
    match framework {
        Framework::OpenAi => &OpenAiWire,
        Framework::Ollama => &OllamaWire,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn null_content_reads_as_empty() {
        let message: ChatMessage =
            serde_json::from_value(json!({"role": "assistant", "content": null, "tool_calls": null}))
                .unwrap();
        assert_eq!(message.content, None);
        assert_eq!(message.text(), "");
        assert!(message.tool_calls.is_empty());
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "role": "assistant",
            "content": "hi",
            "images": null,
            "thinking": "pondering"
        });
        let message: ChatMessage = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(message.extra["thinking"], "pondering");
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }

    #[test]
    fn content_parts_are_joined() {
        let message: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [{"type": "text", "text": "checking "}, {"type": "text", "text": "stock"}]
        }))
        .unwrap();
        assert_eq!(message.text(), "checking stock");
    }

    #[test]
    fn function_fields_survive_round_trip() {
        let raw = json!({"function": {"index": 0, "name": "add", "arguments": {"a": 1}}});
        let call: ToolCall = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(call.function.extra["index"], 0);
        assert_eq!(serde_json::to_value(&call).unwrap(), raw);
    }

    #[test]
    fn tool_message_omits_empty_fields() {
        let value = serde_json::to_value(ChatMessage::user("ping")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "ping"}));
    }

    #[test]
    fn selects_adapter_by_framework() {
        assert_eq!(wire_adapter(Framework::OpenAi).framework(), Framework::OpenAi);
        assert_eq!(wire_adapter(Framework::Ollama).framework(), Framework::Ollama);
    }
}
