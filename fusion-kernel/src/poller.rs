//! Concurrent execution of a batch of asynchronous invocations.

use std::collections::HashMap;

use fusion_adapters::{ChatMessage, InvocationRequest, wire_adapter};
use fusion_primitives::Framework;
use fusion_telemetry::Stopwatch;
use fusion_tools::ToolFunction;
use futures::future::join_all;
use tracing::{debug, info};

use crate::invocation;

/// Runs every entry of `batch` concurrently and waits for all of them.
///
/// Returns one tool message per entry in submission order, encoded for
/// `framework`. A failing entry yields an
/// `"Error executing tool '<name>': <message>"` result and does not affect the
/// others. Nothing is cancelled and no timeout is applied.
pub async fn poll_async(
    callables: &HashMap<String, ToolFunction>,
    batch: Vec<InvocationRequest>,
    framework: Framework,
) -> Vec<ChatMessage> {
    poll_timed(callables, batch, framework, false).await
}

/// Same as [`poll_async`]; per-invocation times are logged at `info` when
/// `report_timing` is set and at `debug` otherwise.
pub(crate) async fn poll_timed(
    callables: &HashMap<String, ToolFunction>,
    batch: Vec<InvocationRequest>,
    framework: Framework,
    report_timing: bool,
) -> Vec<ChatMessage> {
    let adapter = wire_adapter(framework);
    let pending = batch.into_iter().map(|request| {
        let resolved = invocation::resolve(adapter, callables, &request);
        async move {
            let watch = Stopwatch::start();
            let outcome = invocation::call(resolved).await;
            if report_timing {
                info!(tool = %request.name, elapsed_ms = watch.elapsed_ms(), "tool execution time");
            } else {
                debug!(
                    tool = %request.name,
                    elapsed_ms = watch.elapsed_ms(),
                    "parallel invocation finished"
                );
            }
            invocation::tool_message(adapter, &request, outcome)
        }
    });

    join_all(pending).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use fusion_adapters::MessageRole;
    use fusion_tools::{ToolError, ToolResult};
    use serde_json::{Value, json};
    use tracing::Level;

    use crate::BlockingExecutor;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn info_logs_of_batch(report_timing: bool) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut callables = HashMap::new();
        for name in ["first", "second"] {
            callables.insert(
                name.to_owned(),
                ToolFunction::asynchronous(name, |_input: Value| async {
                    ToolResult::Ok(json!("ok"))
                }),
            );
        }
        let batch = vec![openai_request("a", "first"), openai_request("b", "second")];

        let executor = BlockingExecutor::new().unwrap();
        let results = tracing::subscriber::with_default(subscriber, || {
            executor.block_on(poll_timed(&callables, batch, Framework::OpenAi, report_timing))
        });
        assert_eq!(results.len(), 2);
        logs.text()
    }

    fn delayed(name: &str, millis: u64, finished: Arc<Mutex<Vec<String>>>) -> ToolFunction {
        let label = name.to_owned();
        ToolFunction::asynchronous(name, move |_input: Value| {
            let label = label.clone();
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                finished.lock().unwrap().push(label.clone());
                Ok::<_, ToolError>(Value::String(format!("{label} done")))
            }
        })
    }

    fn openai_request(id: &str, name: &str) -> InvocationRequest {
        InvocationRequest {
            id: Some(id.to_owned()),
            name: name.to_owned(),
            arguments: json!("{}"),
        }
    }

    #[tokio::test]
    async fn results_follow_submission_order() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let mut callables = HashMap::new();
        for (name, millis) in [("tool1", 300), ("tool2", 100), ("tool3", 200)] {
            callables.insert(name.to_owned(), delayed(name, millis, Arc::clone(&finished)));
        }
        let batch = vec![
            openai_request("a", "tool1"),
            openai_request("b", "tool2"),
            openai_request("c", "tool3"),
        ];

        let watch = Stopwatch::start();
        let results = poll_async(&callables, batch, Framework::OpenAi).await;

        assert!(watch.elapsed() < Duration::from_millis(550));
        assert_eq!(*finished.lock().unwrap(), ["tool2", "tool3", "tool1"]);
        let names: Vec<_> = results.iter().map(|m| m.name.as_deref().unwrap()).collect();
        assert_eq!(names, ["tool1", "tool2", "tool3"]);
        let ids: Vec<_> = results
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(results[0].text(), "\"tool1 done\"");
        assert!(results.iter().all(|m| m.role == MessageRole::Tool));
    }

    #[test]
    fn timing_reports_each_invocation_at_info() {
        let logs = info_logs_of_batch(true);
        assert_eq!(logs.matches("tool execution time").count(), 2);
        assert!(logs.contains("tool=first"));
        assert!(logs.contains("tool=second"));
    }

    #[test]
    fn timing_stays_below_info_by_default() {
        let logs = info_logs_of_batch(false);
        assert!(!logs.contains("tool execution time"));
        assert!(!logs.contains("parallel invocation finished"));
    }

    #[tokio::test]
    async fn failures_do_not_affect_siblings() {
        let mut callables = HashMap::new();
        callables.insert(
            "fails".to_owned(),
            ToolFunction::asynchronous("fails", |_input: Value| async {
                Err::<Value, _>(ToolError::execution("upstream unavailable"))
            }),
        );
        callables.insert(
            "works".to_owned(),
            ToolFunction::asynchronous("works", |_input: Value| async {
                ToolResult::Ok(json!("ok"))
            }),
        );
        let batch = vec![
            InvocationRequest {
                id: None,
                name: "fails".to_owned(),
                arguments: json!({}),
            },
            InvocationRequest {
                id: None,
                name: "works".to_owned(),
                arguments: json!({}),
            },
        ];

        let results = poll_async(&callables, batch, Framework::Ollama).await;

        assert_eq!(
            results[0].text(),
            "Error executing tool 'fails': upstream unavailable"
        );
        assert_eq!(results[1].text(), "ok");
        assert_eq!(results[1].tool_call_id, None);
    }
}
