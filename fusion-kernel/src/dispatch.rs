//! Tool-call dispatch loop.
//!
//! Each round inspects the latest LLM response through the registry's wire
//! adapter. A response without tool calls ends the loop. Otherwise the
//! assistant turn is appended, the requested tools run (blocking tools in
//! place, asynchronous tools awaited individually or batched through
//! [`poll_async`](crate::poll_async)), their results are appended as tool messages and the LLM is
//! queried again with the unchanged schema list.
//!
//! Once the number of rounds exceeds
//! [`DispatchConfig::max_chained_calls`], a single [`CHAIN_LIMIT_DIRECTIVE`]
//! system message is appended and the LLM is re-queried without running any
//! tool. If the reply to that directive still requests tools, the loop ends
//! and returns that reply.

use std::collections::HashMap;

use fusion_adapters::{ChatMessage, InvocationRequest, WireAdapter, wire_adapter};
use fusion_primitives::ToolKind;
use fusion_telemetry::Stopwatch;
use fusion_tools::{ToolDefinition, ToolError, ToolFunction, ToolRegistry, ToolResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::client::{BlockingLlmClient, LlmClient, LlmResult};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::executor::LazyExecutor;
use crate::invocation;
use crate::poller::poll_timed;

/// System message appended once the chained round ceiling is exceeded.
pub const CHAIN_LIMIT_DIRECTIVE: &str = "The maximum number of chained tool calls has been reached. \
Answer the user now using only the tool results obtained so far and do not request any further tool calls.";

macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// Terminal result of a dispatch call.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    /// The final LLM response, untouched.
    Response(Value),
    /// Textual content of the final response (`clean_messages`).
    Text(String),
}

impl Completion {
    /// Returns the text when the response was collapsed.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Response(_) => None,
        }
    }

    /// Returns the raw response when it was not collapsed.
    #[must_use]
    pub fn as_response(&self) -> Option<&Value> {
        match self {
            Self::Response(response) => Some(response),
            Self::Text(_) => None,
        }
    }

    /// Consumes the completion, returning the raw response if present.
    #[must_use]
    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Response(response) => Some(response),
            Self::Text(_) => None,
        }
    }
}

/// Drives the tool-call loop for the tools of one registry.
#[derive(Debug, Clone, Copy)]
pub struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
    config: DispatchConfig,
}

impl<'a> ToolDispatcher<'a> {
    /// Creates a dispatcher for `registry`.
    #[must_use]
    pub const fn new(registry: &'a ToolRegistry, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Processes `response`, awaiting tools and the LLM on the caller's runtime.
    ///
    /// `messages` is extended in place with assistant turns, tool results and,
    /// when the round ceiling is exceeded, the chain limit directive.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Llm`] when `llm` fails. Tool failures are
    /// reported to the LLM and never returned here.
    pub async fn process_tool_calls<C>(
        &self,
        response: Value,
        messages: &mut Vec<ChatMessage>,
        model: &str,
        llm: &C,
    ) -> DispatchResult<Completion>
    where
        C: LlmClient + ?Sized,
    {
        let mut session = Session::open(self.registry, self.config);
        let mut response = response;
        loop {
            match session.plan(&response, messages) {
                Plan::Finish => return Ok(session.finish(response)),
                Plan::ForceAnswer => {}
                Plan::Execute(invocations) => {
                    let results = session.execute(invocations).await;
                    session.append_results(messages, results);
                }
            }
            let outcome = LlmClient::call(llm, model, messages.as_slice(), &session.schemas).await;
            response = session.received(outcome)?;
        }
    }

    /// Processes `response` on the calling thread.
    ///
    /// Asynchronous tools run on a [`BlockingExecutor`](crate::BlockingExecutor)
    /// created on first use and reused until the call returns.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Llm`] when `llm` fails.
    ///
    /// # Panics
    ///
    /// Panics when an asynchronous tool must run and the caller is itself
    /// inside a tokio runtime.
    pub fn process_tool_calls_blocking<C>(
        &self,
        response: Value,
        messages: &mut Vec<ChatMessage>,
        model: &str,
        llm: &C,
    ) -> DispatchResult<Completion>
    where
        C: BlockingLlmClient + ?Sized,
    {
        let mut session = Session::open(self.registry, self.config);
        let mut executor = LazyExecutor::default();
        let mut response = response;
        loop {
            match session.plan(&response, messages) {
                Plan::Finish => return Ok(session.finish(response)),
                Plan::ForceAnswer => {}
                Plan::Execute(invocations) => {
                    let results = session.execute_blocking(&mut executor, invocations);
                    session.append_results(messages, results);
                }
            }
            let outcome = BlockingLlmClient::call(llm, model, messages.as_slice(), &session.schemas);
            response = session.received(outcome)?;
        }
    }
}

/// Processes `response` against `registry` on the caller's runtime.
///
/// # Errors
///
/// Returns [`DispatchError::Llm`] when `llm` fails.
pub async fn process_tool_calls<C>(
    response: Value,
    messages: &mut Vec<ChatMessage>,
    registry: &ToolRegistry,
    model: &str,
    llm: &C,
    config: DispatchConfig,
) -> DispatchResult<Completion>
where
    C: LlmClient + ?Sized,
{
    ToolDispatcher::new(registry, config)
        .process_tool_calls(response, messages, model, llm)
        .await
}

/// Processes `response` against `registry` on the calling thread.
///
/// # Errors
///
/// Returns [`DispatchError::Llm`] when `llm` fails.
///
/// # Panics
///
/// Panics when an asynchronous tool must run and the caller is itself inside a
/// tokio runtime.
pub fn process_tool_calls_blocking<C>(
    response: Value,
    messages: &mut Vec<ChatMessage>,
    registry: &ToolRegistry,
    model: &str,
    llm: &C,
    config: DispatchConfig,
) -> DispatchResult<Completion>
where
    C: BlockingLlmClient + ?Sized,
{
    ToolDispatcher::new(registry, config)
        .process_tool_calls_blocking(response, messages, model, llm)
}

enum Plan {
    Finish,
    ForceAnswer,
    Execute(Vec<InvocationRequest>),
}

#[derive(Debug, Default)]
struct ChainState {
    rounds: usize,
    directive_sent: bool,
}

/// State shared by both surfaces for the duration of one dispatch call.
struct Session {
    adapter: &'static dyn WireAdapter,
    config: DispatchConfig,
    schemas: Vec<ToolDefinition>,
    callables: HashMap<String, ToolFunction>,
    chain: ChainState,
    watch: Stopwatch,
}

impl Session {
    fn open(registry: &ToolRegistry, config: DispatchConfig) -> Self {
        Self {
            adapter: wire_adapter(registry.framework()),
            config,
            schemas: registry.export_schemas(),
            callables: registry.callable_by_name(),
            chain: ChainState::default(),
            watch: Stopwatch::start(),
        }
    }

    fn plan(&mut self, response: &Value, messages: &mut Vec<ChatMessage>) -> Plan {
        let invocations = self.adapter.invocations(response);
        if invocations.is_empty() {
            return Plan::Finish;
        }

        if self.chain.directive_sent {
            warn!(
                framework = %self.adapter.framework(),
                rounds = self.chain.rounds,
                requested = invocations.len(),
                "tool calls requested after the chain limit directive; returning response"
            );
            return Plan::Finish;
        }

        self.adapter.append_assistant_turn(messages, response);
        self.chain.rounds += 1;

        if self.chain.rounds > self.config.max_chained_calls() {
            warn!(
                round = self.chain.rounds,
                limit = self.config.max_chained_calls(),
                "chained tool call limit exceeded; requesting a final answer"
            );
            messages.push(ChatMessage::system(CHAIN_LIMIT_DIRECTIVE));
            self.chain.directive_sent = true;
            return Plan::ForceAnswer;
        }

        progress!(
            self.config.verbose(),
            round = self.chain.rounds,
            framework = %self.adapter.framework(),
            tools = ?invocations.iter().map(|request| request.name.as_str()).collect::<Vec<_>>(),
            "executing tool calls"
        );
        Plan::Execute(invocations)
    }

    fn finish(&self, response: Value) -> Completion {
        progress!(
            self.config.verbose(),
            rounds = self.chain.rounds,
            "no tool calls requested; dispatch finished"
        );
        if self.config.verbose_time() {
            info!(
                rounds = self.chain.rounds,
                elapsed_ms = self.watch.elapsed_ms(),
                "total dispatch time"
            );
        }

        if self.config.clean_messages() {
            Completion::Text(self.adapter.text_content(&response).unwrap_or_default())
        } else {
            Completion::Response(response)
        }
    }

    fn received(&self, outcome: LlmResult) -> DispatchResult<Value> {
        outcome.map_err(|source| {
            warn!(round = self.chain.rounds, error = %source, "LLM invocation failed");
            DispatchError::Llm {
                round: self.chain.rounds,
                source,
            }
        })
    }

    fn append_results(&self, messages: &mut Vec<ChatMessage>, results: Vec<ChatMessage>) {
        progress!(
            self.config.verbose(),
            round = self.chain.rounds,
            results = results.len(),
            "tool results appended; querying LLM"
        );
        messages.extend(results);
    }

    fn is_deferred(&self, request: &InvocationRequest) -> bool {
        self.config.use_async_poll()
            && self
                .callables
                .get(&request.name)
                .is_some_and(|function| function.kind() == ToolKind::Async)
    }

    fn complete(
        &self,
        request: &InvocationRequest,
        outcome: ToolResult<Value>,
        watch: Stopwatch,
    ) -> ChatMessage {
        if self.config.verbose_time() {
            info!(tool = %request.name, elapsed_ms = watch.elapsed_ms(), "tool execution time");
        }
        progress!(
            self.config.verbose(),
            tool = %request.name,
            succeeded = outcome.is_ok(),
            "tool executed"
        );
        invocation::tool_message(self.adapter, request, outcome)
    }

    async fn execute(&self, invocations: Vec<InvocationRequest>) -> Vec<ChatMessage> {
        let mut results = Vec::with_capacity(invocations.len());
        let mut batch = Vec::new();

        for request in invocations {
            if self.is_deferred(&request) {
                batch.push(request);
                continue;
            }
            let watch = Stopwatch::start();
            let resolved = invocation::resolve(self.adapter, &self.callables, &request);
            let outcome = invocation::call(resolved).await;
            results.push(self.complete(&request, outcome, watch));
        }

        if !batch.is_empty() {
            results.extend(self.poll(batch).await);
        }
        results
    }

    fn execute_blocking(
        &self,
        executor: &mut LazyExecutor,
        invocations: Vec<InvocationRequest>,
    ) -> Vec<ChatMessage> {
        let mut results = Vec::with_capacity(invocations.len());
        let mut batch = Vec::new();

        for request in invocations {
            if self.is_deferred(&request) {
                batch.push(request);
                continue;
            }
            let watch = Stopwatch::start();
            let outcome = match invocation::resolve(self.adapter, &self.callables, &request) {
                Ok(invocation::Resolved::Blocking(tool, arguments)) => {
                    invocation::call_blocking(tool.as_ref(), arguments)
                }
                Ok(invocation::Resolved::Async(tool, arguments)) => match executor.get() {
                    Ok(executor) => executor.block_on(invocation::call_async(tool, arguments)),
                    Err(err) => Err(ToolError::execution(err.to_string())),
                },
                Err(err) => Err(err),
            };
            results.push(self.complete(&request, outcome, watch));
        }

        if !batch.is_empty() {
            match executor.get() {
                Ok(executor) => results.extend(executor.block_on(self.poll(batch))),
                Err(err) => {
                    let err = ToolError::execution(err.to_string());
                    for request in batch {
                        results.push(invocation::tool_message(
                            self.adapter,
                            &request,
                            Err(err.clone()),
                        ));
                    }
                }
            }
        }
        results
    }

    async fn poll(&self, batch: Vec<InvocationRequest>) -> Vec<ChatMessage> {
        let size = batch.len();
        let watch = Stopwatch::start();
        let results = poll_timed(
            &self.callables,
            batch,
            self.adapter.framework(),
            self.config.verbose_time(),
        )
        .await;
        if self.config.verbose_time() {
            info!(batch = size, elapsed_ms = watch.elapsed_ms(), "parallel batch time");
        }
        progress!(self.config.verbose(), batch = size, "parallel batch finished");
        results
    }
}
