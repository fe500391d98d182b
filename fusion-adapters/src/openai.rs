//! OpenAI-style chat completion layout.
//!
//! Invocations live under `choices[0].message.tool_calls`, each with an `id`
//! and JSON-string `arguments`. Tool results are JSON-encoded and answer the
//! call through `tool_call_id`.

use fusion_primitives::Framework;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::traits::{
    AdapterError, AdapterResult, ChatMessage, InvocationRequest, MessageRole, WireAdapter,
};

/// Chat completion response body.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletion {
    /// Candidate completions; only the first is read.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Single completion candidate.
#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    /// Assistant message.
    pub message: ChatMessage,
    /// Reason the model stopped generating.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Adapter for OpenAI-style responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiWire;

impl OpenAiWire {
    fn first_message(response: &Value) -> Option<ChatMessage> {
        match ChatCompletion::deserialize(response) {
            Ok(completion) => completion.choices.into_iter().next().map(|choice| choice.message),
            Err(err) => {
                let err = AdapterError::MalformedResponse {
                    framework: Framework::OpenAi,
                    reason: err.to_string(),
                };
                warn!(error = %err, "treating response as carrying no tool calls");
                None
            }
        }
    }
}

impl WireAdapter for OpenAiWire {
    fn framework(&self) -> Framework {
        Framework::OpenAi
    }

    fn invocations(&self, response: &Value) -> Vec<InvocationRequest> {
        Self::first_message(response)
            .map(|message| message.tool_calls.iter().map(InvocationRequest::from).collect())
            .unwrap_or_default()
    }

    fn text_content(&self, response: &Value) -> Option<String> {
        Self::first_message(response).map(|message| message.content.unwrap_or_default())
    }

    fn append_assistant_turn(&self, conversation: &mut Vec<ChatMessage>, response: &Value) {
        let (content, tool_calls) = Self::first_message(response)
            .map(|message| (message.content.unwrap_or_default(), message.tool_calls))
            .unwrap_or_default();
        conversation.push(ChatMessage::assistant(content).with_tool_calls(tool_calls));
    }

    fn decode_arguments(&self, arguments: &Value) -> AdapterResult<Value> {
        match arguments {
            Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
            Value::String(raw) => serde_json::from_str(raw)
                .map_err(|err| AdapterError::invalid_arguments(err.to_string())),
            Value::Null => Ok(Value::Object(Map::new())),
            Value::Object(_) => Ok(arguments.clone()),
            other => Err(AdapterError::invalid_arguments(format!(
                "expected a JSON-encoded object, found `{other}`"
            ))),
        }
    }

    fn encode_result(&self, output: &Value) -> String {
        output.to_string()
    }

    fn tool_message(&self, invocation: &InvocationRequest, content: String) -> ChatMessage {
        ChatMessage {
            tool_call_id: invocation.id.clone(),
            name: Some(invocation.name.clone()),
            ..ChatMessage::new(MessageRole::Tool, content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn response() -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "add", "arguments": "{\"a\": 2, \"b\": 3}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "fetch_news", "arguments": "{\"topic\": \"rust\"}"}}
                    ]
                }
            }]
        })
    }

    #[test]
    fn reads_invocations_from_first_choice() {
        let invocations = OpenAiWire.invocations(&response());
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].id.as_deref(), Some("call_1"));
        assert_eq!(invocations[0].name, "add");
        assert_eq!(invocations[1].arguments, json!("{\"topic\": \"rust\"}"));
        assert!(OpenAiWire.has_invocations(&response()));
    }

    #[test]
    fn text_response_has_no_invocations() {
        let response = json!({"choices": [{"message": {"role": "assistant", "content": "5"}}]});
        assert!(!OpenAiWire.has_invocations(&response));
        assert_eq!(OpenAiWire.text_content(&response).as_deref(), Some("5"));
    }

    #[test]
    fn content_parts_do_not_hide_tool_calls() {
        let response = json!({"choices": [{"message": {
            "role": "assistant",
            "content": [{"type": "text", "text": "adding"}],
            "tool_calls": [{"id": "call_9", "type": "function", "function": {"name": "add", "arguments": "{}"}}]
        }}]});
        let invocations = OpenAiWire.invocations(&response);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].id.as_deref(), Some("call_9"));
        assert_eq!(OpenAiWire.text_content(&response).as_deref(), Some("adding"));
    }

    #[test]
    fn malformed_response_is_empty() {
        let response = json!({"error": "rate limited"});
        assert!(OpenAiWire.invocations(&response).is_empty());
        assert_eq!(OpenAiWire.text_content(&response), None);
    }

    #[test]
    fn assistant_turn_is_synthesised_with_tool_calls() {
        let mut conversation = Vec::new();
        OpenAiWire.append_assistant_turn(&mut conversation, &response());

        assert_eq!(conversation.len(), 1);
        let turn = &conversation[0];
        assert_eq!(turn.role, MessageRole::Assistant);
        assert_eq!(turn.text(), "");
        assert_eq!(turn.tool_calls.len(), 2);
        assert!(turn.extra.is_empty());
    }

    #[test]
    fn decodes_json_string_arguments() {
        let decoded = OpenAiWire.decode_arguments(&json!("{\"a\": 2}")).unwrap();
        assert_eq!(decoded, json!({"a": 2}));
        assert_eq!(OpenAiWire.decode_arguments(&json!("")).unwrap(), json!({}));

        let err = OpenAiWire.decode_arguments(&json!("{not json")).expect_err("invalid json");
        assert!(matches!(err, AdapterError::InvalidArguments { .. }));
    }

    #[test]
    fn results_are_json_encoded() {
        assert_eq!(OpenAiWire.encode_result(&json!("5")), "\"5\"");
        assert_eq!(OpenAiWire.encode_result(&json!(5)), "5");
        assert_eq!(OpenAiWire.encode_result(&json!({"ok": true})), "{\"ok\":true}");
    }

    #[test]
    fn tool_message_carries_call_id_and_name() {
        let invocation = InvocationRequest {
            id: Some("call_1".into()),
            name: "add".into(),
            arguments: json!("{}"),
        };
        let message = OpenAiWire.tool_message(&invocation, "5".into());
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "tool", "content": "5", "tool_call_id": "call_1", "name": "add"})
        );
    }
}
