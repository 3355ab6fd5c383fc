//! Tool dispatch with failure isolation.
//!
//! The dispatcher owns the shared adapter contract: a hard per-call
//! timeout, bounded retries with exponential backoff for transient
//! failures only, and conversion of every outcome (including faults) into
//! a `ToolResult` the planning loop can reason over. `dispatch` never
//! returns an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use pantry_core::config::EngineConfig;
use pantry_core::tool::{ToolAdapter, ToolCall, ToolDescriptor, ToolResponse, ToolResult};

/// Registry and executor for every tool the planner may invoke.
pub struct ToolDispatcher {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl ToolDispatcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            adapters: HashMap::new(),
            timeout: config.tool_timeout(),
            max_retries: config.max_tool_retries,
            backoff: config.retry_backoff(),
        }
    }

    /// Registers an adapter under its descriptor name.
    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.descriptor().name;
        self.adapters.insert(name, adapter);
    }

    /// Descriptors for every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .adapters
            .values()
            .map(|adapter| adapter.descriptor())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Executes one tool call, always producing a `ToolResult`.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(adapter) = self.adapters.get(&call.tool_name) else {
            warn!(tool = %call.tool_name, "planner requested an unknown tool");
            return ToolResult::error(
                call.tool_name.clone(),
                format!("unknown tool '{}'", call.tool_name),
                Duration::ZERO,
            );
        };

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            debug!(tool = %call.tool_name, attempt, "invoking tool");
            match tokio::time::timeout(self.timeout, adapter.invoke(&call.arguments)).await {
                Err(_) => {
                    warn!(tool = %call.tool_name, timeout = ?self.timeout, "tool call timed out");
                    return ToolResult::timeout(call.tool_name.clone(), started.elapsed());
                }
                Ok(Ok(ToolResponse::Success(payload))) => {
                    return ToolResult::ok(call.tool_name.clone(), payload, started.elapsed());
                }
                Ok(Ok(ToolResponse::NotFound(detail))) => {
                    return ToolResult::not_found(call.tool_name.clone(), detail, started.elapsed());
                }
                Ok(Err(err)) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        tool = %call.tool_name,
                        attempt,
                        error = %err,
                        delay = ?delay,
                        "transient tool failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(Err(err)) => {
                    warn!(tool = %call.tool_name, attempt, error = %err, "tool call failed");
                    return ToolResult::error(
                        call.tool_name.clone(),
                        err.to_string(),
                        started.elapsed(),
                    );
                }
            }
        }
    }

    /// Exponential backoff with up to 50% random jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(1 << attempt.min(8));
        let jitter_ms = if base.as_millis() > 1 {
            rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 2))
        } else {
            0
        };
        base + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pantry_core::error::{PantryError, Result};
    use pantry_core::tool::{ToolPayload, ToolStatus};
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubAdapter {
        name: &'static str,
        invocations: Arc<AtomicU32>,
        behavior: Behavior,
    }

    enum Behavior {
        Ok,
        NotFound,
        /// Fail with a transient error this many times, then succeed.
        TransientThenOk(u32),
        PermanentError,
        Hang,
    }

    impl StubAdapter {
        fn new(name: &'static str, behavior: Behavior) -> (Arc<Self>, Arc<AtomicU32>) {
            let invocations = Arc::new(AtomicU32::new(0));
            let adapter = Arc::new(Self {
                name,
                invocations: invocations.clone(),
                behavior,
            });
            (adapter, invocations)
        }
    }

    #[async_trait]
    impl ToolAdapter for StubAdapter {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::single_string_arg(self.name, "stub", "input", "stub input")
        }

        async fn invoke(&self, _arguments: &Map<String, Value>) -> Result<ToolResponse> {
            let attempt = self.invocations.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Ok => Ok(ToolResponse::Success(ToolPayload::Text("done".into()))),
                Behavior::NotFound => Ok(ToolResponse::NotFound("nothing there".into())),
                Behavior::TransientThenOk(failures) => {
                    if attempt < *failures {
                        Err(PantryError::upstream("stub", Some(503), "flaky", true))
                    } else {
                        Ok(ToolResponse::Success(ToolPayload::Text("recovered".into())))
                    }
                }
                Behavior::PermanentError => {
                    Err(PantryError::upstream("stub", Some(404), "gone", false))
                }
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hanging stub must be cut off by the timeout")
                }
            }
        }
    }

    fn dispatcher_with(adapter: Arc<dyn ToolAdapter>, max_retries: u32) -> ToolDispatcher {
        let config = EngineConfig {
            max_planning_iterations: 6,
            tool_timeout_secs: 2,
            max_tool_retries: max_retries,
            retry_backoff_ms: 10,
        };
        let mut dispatcher = ToolDispatcher::new(&config);
        dispatcher.register(adapter);
        dispatcher
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, Map::new())
    }

    #[tokio::test]
    async fn success_path_returns_ok_result() {
        let (adapter, invocations) = StubAdapter::new("stub", Behavior::Ok);
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::Ok);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_a_first_class_result_without_retries() {
        let (adapter, invocations) = StubAdapter::new("stub", Behavior::NotFound);
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::NotFound);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_within_the_bound() {
        let (adapter, invocations) = StubAdapter::new("stub", Behavior::TransientThenOk(2));
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::Ok);
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_bound_is_respected() {
        let (adapter, invocations) = StubAdapter::new("stub", Behavior::TransientThenOk(5));
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::Error);
        // initial attempt + two retries
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (adapter, invocations) = StubAdapter::new("stub", Behavior::PermanentError);
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_adapter_yields_timeout_status() {
        let (adapter, _) = StubAdapter::new("stub", Behavior::Hang);
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("stub")).await;
        assert_eq!(result.status, ToolStatus::Timeout);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let (adapter, _) = StubAdapter::new("stub", Behavior::Ok);
        let dispatcher = dispatcher_with(adapter, 2);

        let result = dispatcher.dispatch(&call("no-such-tool")).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.payload.summary().contains("unknown tool"));
    }

    #[tokio::test]
    async fn descriptors_are_sorted_by_name() {
        let (b, _) = StubAdapter::new("beta", Behavior::Ok);
        let (a, _) = StubAdapter::new("alpha", Behavior::Ok);
        let mut dispatcher = dispatcher_with(b, 0);
        dispatcher.register(a);

        let names: Vec<String> = dispatcher
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
