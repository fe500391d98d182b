use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tool_fusion::adapters::InvocationRequest;
use tool_fusion::kernel::{CHAIN_LIMIT_DIRECTIVE, poll_async, process_tool_calls};
use tool_fusion::prelude::*;
use tool_fusion::tools::tool;

/// Adds two integers.
///
/// Args:
///     a (int): first addend
///     b (int): second addend
#[tool(crate = tool_fusion::tools)]
fn add(a: i64, b: i64) -> i64 {
    a + b
}

/// Divides two numbers.
///
/// Args:
///     a (float): dividend
///     b (float): divisor
#[tool(crate = tool_fusion::tools)]
fn divide(a: f64, b: f64) -> Result<f64, String> {
    if b == 0.0 {
        Err("division by zero".to_owned())
    } else {
        Ok(a / b)
    }
}

/// Waits before answering.
///
/// Args:
///     label (str): value echoed back
///     millis (int): delay in milliseconds
#[tool(crate = tool_fusion::tools)]
async fn delayed_echo(label: String, millis: u64) -> String {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    label
}

struct Script {
    responses: Mutex<VecDeque<Value>>,
    fallback: Value,
    calls: AtomicUsize,
}

impl Script {
    fn new(responses: Vec<Value>, fallback: Value) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for Script {
    async fn call(&self, _: &str, _: &[ChatMessage], _: &[ToolDefinition]) -> LlmResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

fn tool_calls(calls: &[(&str, &str, Value)]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": arguments.to_string()}
            })
        })
        .collect();
    json!({"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": calls}}]})
}

fn text(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register_tool(add_tool()).unwrap();
    registry.register_tool(divide_tool()).unwrap();
    registry.register_tool(delayed_echo_tool()).unwrap();
    registry
}

#[tokio::test]
async fn add_two_and_three() {
    let registry = registry();
    let llm = Script::new(vec![text("5")], text("unused"));
    let mut messages = vec![ChatMessage::user("What is 2 + 3?")];

    let completion = process_tool_calls(
        tool_calls(&[("call_1", "add", json!({"a": 2, "b": 3}))]),
        &mut messages,
        &registry,
        "gpt-4o-mini",
        &llm,
        DispatchConfig::default().with_clean_messages(true),
    )
    .await
    .unwrap();

    assert_eq!(completion, Completion::Text("5".to_owned()));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(messages.last().unwrap().text(), "5");
}

#[tokio::test]
async fn no_tool_calls_leaves_conversation_untouched() {
    let registry = registry();
    let llm = Script::new(Vec::new(), text("unused"));
    let mut messages = vec![ChatMessage::user("Hello")];
    let first = LlmClient::call(&llm, "gpt-4o-mini", &messages, &registry.export_schemas())
        .await
        .unwrap();

    let completion = ToolDispatcher::new(&registry, DispatchConfig::default())
        .process_tool_calls(first, &mut messages, "gpt-4o-mini", &llm)
        .await
        .unwrap();

    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(messages, vec![ChatMessage::user("Hello")]);
    assert!(completion.as_response().is_some());
}

#[tokio::test]
async fn failing_tool_still_reaches_the_llm() {
    let registry = registry();
    let llm = Script::new(vec![text("cannot divide by zero")], text("unused"));
    let mut messages = Vec::new();

    let completion = ToolDispatcher::new(&registry, DispatchConfig::default().with_clean_messages(true))
        .process_tool_calls(
            tool_calls(&[
                ("call_1", "divide", json!({"a": 1, "b": 0})),
                ("call_2", "divide", json!({"a": 1, "b": 4})),
            ]),
            &mut messages,
            "gpt-4o-mini",
            &llm,
        )
        .await
        .unwrap();

    assert_eq!(completion.as_text(), Some("cannot divide by zero"));
    assert_eq!(messages[1].text(), "Error executing tool 'divide': division by zero");
    assert_eq!(messages[2].text(), "0.25");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chain_limit_adds_one_directive() {
    let registry = registry();
    let looping = tool_calls(&[("call_n", "add", json!({"a": 1, "b": 1}))]);
    let llm = Script::new(Vec::new(), looping.clone());
    let mut messages = Vec::new();

    ToolDispatcher::new(&registry, DispatchConfig::default().with_max_chained_calls(2))
        .process_tool_calls(looping, &mut messages, "gpt-4o-mini", &llm)
        .await
        .unwrap();

    let system: Vec<_> = messages
        .iter()
        .filter(|message| message.role == MessageRole::System)
        .collect();
    assert_eq!(system.len(), 1);
    assert_eq!(system[0].text(), CHAIN_LIMIT_DIRECTIVE);
    let executed = messages
        .iter()
        .filter(|message| message.role == MessageRole::Tool)
        .count();
    assert_eq!(executed, 2);
}

#[tokio::test]
async fn parallel_poll_preserves_submission_order() {
    let callables: HashMap<String, ToolFunction> = registry().callable_by_name();
    let batch = [("t1", "tool1", 300), ("t2", "tool2", 100), ("t3", "tool3", 200)]
        .into_iter()
        .map(|(id, label, millis)| InvocationRequest {
            id: Some(id.to_owned()),
            name: "delayed_echo".to_owned(),
            arguments: json!(json!({"label": label, "millis": millis}).to_string()),
        })
        .collect();

    let started = Instant::now();
    let results = poll_async(&callables, batch, Framework::OpenAi).await;

    assert!(started.elapsed() < Duration::from_millis(550));
    let contents: Vec<_> = results.iter().map(|message| message.text()).collect();
    assert_eq!(contents, ["\"tool1\"", "\"tool2\"", "\"tool3\""]);
}

#[tokio::test]
async fn ollama_conversation_round_trip() {
    let registry = ToolRegistry::new().with_framework(Framework::Ollama);
    registry.register_tool(divide_tool()).unwrap();
    let request = json!({
        "model": "llama3.2",
        "message": {
            "role": "assistant",
            "content": "",
            "tool_calls": [{"function": {"name": "divide", "arguments": {"a": 9, "b": 3}}}]
        },
        "done": true
    });
    let answer = json!({"model": "llama3.2", "message": {"role": "assistant", "content": "3"}, "done": true});
    let llm = Script::new(vec![answer], text("unused"));
    let mut messages = vec![ChatMessage::user("9 / 3?")];

    let completion = ToolDispatcher::new(&registry, DispatchConfig::default().with_clean_messages(true))
        .process_tool_calls(request, &mut messages, "llama3.2", &llm)
        .await
        .unwrap();

    assert_eq!(completion.as_text(), Some("3"));
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[2].text(), "3.0");
    assert_eq!(messages[2].name.as_deref(), Some("divide"));
    assert_eq!(messages[2].tool_call_id, None);
}

#[test]
fn blocking_surface_with_parallel_async_tools() {
    let registry = registry();
    let llm = |_: &str, messages: &[ChatMessage], _: &[ToolDefinition]| -> LlmResult {
        let joined: Vec<_> = messages
            .iter()
            .filter(|message| message.role == MessageRole::Tool)
            .map(|message| message.text().to_owned())
            .collect();
        Ok(text(&joined.join(",")))
    };
    let mut messages = Vec::new();
    let config = DispatchConfig::default()
        .with_async_poll(true)
        .with_clean_messages(true)
        .with_verbose(true)
        .with_verbose_time(true);

    let completion = ToolDispatcher::new(&registry, config)
        .process_tool_calls_blocking(
            tool_calls(&[
                ("c1", "delayed_echo", json!({"label": "slow", "millis": 150})),
                ("c2", "add", json!({"a": 20, "b": 22})),
                ("c3", "delayed_echo", json!({"label": "fast", "millis": 10})),
            ]),
            &mut messages,
            "gpt-4o-mini",
            &llm,
        )
        .unwrap();

    assert_eq!(completion.as_text(), Some("42,\"slow\",\"fast\""));
}
