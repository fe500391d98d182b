//! Drives the dispatch loop with a scripted model so it runs without a provider.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use serde_json::{Value, json};
use tool_fusion::prelude::*;
use tool_fusion::telemetry::init_tracing;
use tool_fusion::tools::tool;
use tracing::info;

/// Calculates the final price of a product after a discount.
///
/// Args:
///     price (float): base price
///     discount (float): discount percentage
#[tool(crate = tool_fusion::tools)]
fn calculate_price(price: f64, discount: f64) -> f64 {
    price * (1.0 - discount / 100.0)
}

/// Fetches the name of a user.
///
/// Args:
///     id (str): user id
#[tool(crate = tool_fusion::tools, name = "get_user_info")]
async fn user_info(id: String) -> Result<String, String> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    match id.as_str() {
        "1" => Ok("User info: joao".to_owned()),
        other => Err(format!("no user with id {other}")),
    }
}

/// Fetches the stock level of a product.
///
/// Args:
///     sku (str): product code
#[tool(crate = tool_fusion::tools)]
async fn stock_level(sku: String) -> u32 {
    tokio::time::sleep(Duration::from_millis(150)).await;
    u32::try_from(sku.len()).unwrap_or(u32::MAX).saturating_mul(7)
}

#[derive(Debug, Parser)]
#[command(about = "Runs the tool-call loop against a scripted model")]
struct Args {
    /// Wire shape of the scripted responses (`openai` or `ollama`).
    #[arg(long, default_value = "openai")]
    framework: Framework,
    /// Run asynchronous tools of one response concurrently.
    #[arg(long)]
    parallel: bool,
    /// Use the blocking surface instead of awaiting on the runtime.
    #[arg(long)]
    blocking: bool,
    /// Number of tool rounds before a final answer is demanded.
    #[arg(long, default_value_t = 5)]
    max_chained_calls: usize,
    /// Log progress and timings at info level.
    #[arg(long)]
    verbose: bool,
}

/// Requests every tool on the first turn, then summarises the tool results.
struct ScriptedModel {
    framework: Framework,
}

impl ScriptedModel {
    fn respond(&self, messages: &[ChatMessage]) -> Value {
        let results: Vec<&str> = messages
            .iter()
            .rev()
            .take_while(|message| message.role == MessageRole::Tool)
            .map(|message| message.text())
            .collect();

        if results.is_empty() {
            self.tool_calls(&[
                ("calculate_price", json!({"price": 100, "discount": 20})),
                ("get_user_info", json!({"id": "1"})),
                ("stock_level", json!({"sku": "A-100"})),
            ])
        } else {
            let summary: Vec<&str> = results.into_iter().rev().collect();
            self.text(&format!("Tool results: {}", summary.join("; ")))
        }
    }

    fn tool_calls(&self, calls: &[(&str, Value)]) -> Value {
        match self.framework {
            Framework::OpenAi => {
                let calls: Vec<Value> = calls
                    .iter()
                    .enumerate()
                    .map(|(index, (name, arguments))| {
                        json!({
                            "id": format!("call_{index}"),
                            "type": "function",
                            "function": {"name": name, "arguments": arguments.to_string()}
                        })
                    })
                    .collect();
                json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": null, "tool_calls": calls},
                        "finish_reason": "tool_calls"
                    }]
                })
            }
            Framework::Ollama => {
                let calls: Vec<Value> = calls
                    .iter()
                    .map(|(name, arguments)| json!({"function": {"name": name, "arguments": arguments}}))
                    .collect();
                json!({
                    "model": "scripted",
                    "message": {"role": "assistant", "content": "", "tool_calls": calls},
                    "done": true
                })
            }
        }
    }

    fn text(&self, content: &str) -> Value {
        match self.framework {
            Framework::OpenAi => json!({
                "choices": [{
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }),
            Framework::Ollama => json!({
                "model": "scripted",
                "message": {"role": "assistant", "content": content},
                "done": true
            }),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn call(&self, _model: &str, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> LlmResult {
        Ok(self.respond(messages))
    }
}

fn main() -> Result<()> {
    init_tracing("info")?;
    let args = Args::parse();

    let registry = ToolRegistry::new().with_framework(args.framework);
    registry.register_tool(calculate_price_tool())?;
    registry.register_tool(user_info_tool())?;
    registry.register_tool(stock_level_tool())?;

    let schemas = serde_json::to_string_pretty(&registry.export_schemas())?;
    info!("exported schemas:\n{schemas}");

    let config = DispatchConfig::default()
        .with_async_poll(args.parallel)
        .with_clean_messages(true)
        .with_max_chained_calls(args.max_chained_calls)
        .with_verbose(args.verbose)
        .with_verbose_time(args.verbose);
    let dispatcher = ToolDispatcher::new(&registry, config);
    let model = ScriptedModel {
        framework: args.framework,
    };
    let mut messages = vec![ChatMessage::user(
        "Calculate the final price of a 100 product with a 20% discount and fetch the name of user 1",
    )];
    let first = model.respond(&messages);

    let completion = if args.blocking {
        let llm = |_: &str, messages: &[ChatMessage], _: &[ToolDefinition]| -> LlmResult {
            Ok(model.respond(messages))
        };
        dispatcher.process_tool_calls_blocking(first, &mut messages, "scripted", &llm)?
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        runtime.block_on(dispatcher.process_tool_calls(first, &mut messages, "scripted", &model))?
    };

    info!(framework = %args.framework, messages = messages.len(), "conversation finished");
    info!("final answer: {}", completion.as_text().unwrap_or_default());
    Ok(())
}
