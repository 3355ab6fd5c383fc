//! The orchestration state machine.
//!
//! One query runs `START -> PLANNING -> TOOL_EXECUTING -> FOLDING ->
//! (PLANNING | ANSWERING) -> DONE`, with `ABORTED` reachable from every
//! non-done state. Planning is bounded; tool failures are folded back
//! into context as evidence rather than aborting the run; every path
//! ends with exactly one terminal event on the stream.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pantry_core::config::EngineConfig;
use pantry_core::error::PantryError;
use pantry_core::query::Query;
use pantry_core::session::{SessionMemory, Turn};
use pantry_core::tool::ToolDescriptor;
use pantry_tools::ToolDispatcher;

use crate::context::PlanningContext;
use crate::emitter::EventPublisher;
use crate::planner::{Planner, PlannerDecision};

/// Answer surfaced when the planning bound is exhausted.
const EXHAUSTED_ANSWER: &str =
    "I could not complete this request within the allowed number of steps. \
     Please rephrase or narrow the question.";

/// Orchestration phases, tracked for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Planning,
    ToolExecuting,
    Folding,
    Answering,
    Done,
    Aborted,
}

/// Runs queries against a fixed set of collaborators.
pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    dispatcher: Arc<ToolDispatcher>,
    memory: Arc<SessionMemory>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        dispatcher: Arc<ToolDispatcher>,
        memory: Arc<SessionMemory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            memory,
            config,
        }
    }

    /// Drives one query to a terminal event.
    ///
    /// Never panics the stream open: every exit path emits `Final` or
    /// `Error` (best-effort when the subscriber is already gone).
    pub async fn run(&self, query: Query, mut publisher: EventPublisher) {
        let cancel = publisher.cancellation_token();
        let phase = self.execute(&query, &mut publisher, &cancel).await;
        debug!(query = %query.id, ?phase, "query finished");
        if !publisher.is_terminated() {
            // Defensive close so the stream can never hang open.
            publisher.fail("query ended unexpectedly").await;
        }
    }

    async fn execute(
        &self,
        query: &Query,
        publisher: &mut EventPublisher,
        cancel: &CancellationToken,
    ) -> Phase {
        // START: load the session snapshot and build the reasoning context.
        debug!(query = %query.id, phase = ?Phase::Start, "loading session");
        let session = self.memory.load(&query.session_id).await;
        let mut context = PlanningContext::new(query.text.clone(), &session);
        let descriptors = self.dispatcher.descriptors();
        info!(
            query = %query.id,
            session = %query.session_id,
            turns = session.turns.len(),
            "starting orchestration"
        );

        for iteration in 1..=self.config.max_planning_iterations {
            if cancel.is_cancelled() {
                debug!(query = %query.id, iteration, "cancelled before planning");
                publisher.fail("query cancelled").await;
                return Phase::Aborted;
            }

            // PLANNING
            debug!(query = %query.id, phase = ?Phase::Planning, iteration, "planning");
            let decision = match self.planner.plan(&context, &descriptors).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(query = %query.id, error = %err, "planner failed");
                    publisher
                        .fail("the reasoning backend is unavailable, please retry later")
                        .await;
                    return Phase::Aborted;
                }
            };

            match decision {
                PlannerDecision::FinalAnswer(answer) => {
                    // ANSWERING: persist the exchange, then emit the final.
                    debug!(query = %query.id, phase = ?Phase::Answering, "answer ready");
                    self.record_exchange(query, &answer).await;
                    publisher.finish(answer).await;
                    return Phase::Done;
                }
                PlannerDecision::ToolCall(mut call) => {
                    call.attempt = iteration - 1;
                    if cancel.is_cancelled() {
                        debug!(query = %query.id, "cancelled before tool execution");
                        publisher.fail("query cancelled").await;
                        return Phase::Aborted;
                    }

                    // TOOL_EXECUTING: failures come back as statuses.
                    debug!(
                        query = %query.id,
                        phase = ?Phase::ToolExecuting,
                        tool = %call.tool_name,
                        "dispatching tool call"
                    );
                    let result = self.dispatcher.dispatch(&call).await;

                    if cancel.is_cancelled() {
                        // The in-flight call completed (or timed out); its
                        // result is discarded and no further calls issued.
                        debug!(query = %query.id, tool = %call.tool_name, "cancelled mid-query, discarding result");
                        publisher.fail("query cancelled").await;
                        return Phase::Aborted;
                    }

                    // FOLDING: evidence first, then the ordered progress event.
                    debug!(
                        query = %query.id,
                        phase = ?Phase::Folding,
                        tool = %call.tool_name,
                        status = %result.status,
                        "folding tool result"
                    );
                    if let Some(record) = result.resolved_product() {
                        self.memory
                            .set_last_product(&query.session_id, record.product_ref())
                            .await;
                    }
                    let description = format!(
                        "{} ({} in {} ms)",
                        step_description(&call.tool_name, &descriptors),
                        result.status,
                        result.elapsed.as_millis()
                    );
                    context.fold(&result);
                    publisher.progress(&call.tool_name, description).await;
                }
            }
        }

        // PLANNING bound exhausted.
        let exhausted = PantryError::PlanningExhausted {
            iterations: self.config.max_planning_iterations,
        };
        warn!(query = %query.id, error = %exhausted, "aborting query");
        self.record_exchange(query, EXHAUSTED_ANSWER).await;
        publisher.fail(EXHAUSTED_ANSWER).await;
        Phase::Aborted
    }

    /// Appends the user/agent turn pair once the run has an answer.
    async fn record_exchange(&self, query: &Query, answer: &str) {
        self.memory
            .append_turn(&query.session_id, Turn::user(query.text.clone()))
            .await;
        self.memory
            .append_turn(&query.session_id, Turn::agent(answer))
            .await;
    }
}

/// Human-readable step line for progress events.
fn step_description(tool_name: &str, descriptors: &[ToolDescriptor]) -> String {
    match tool_name {
        "nutrition-lookup" => "querying nutrition database".to_string(),
        "product-facts-lookup" => "querying product facts database".to_string(),
        "web-search" => "searching the web".to_string(),
        "retrieval" => "searching the product knowledge base".to_string(),
        "upc-validate" => "validating UPC".to_string(),
        "upc-check-digit" => "completing UPC check digit".to_string(),
        other if descriptors.iter().any(|d| d.name == other) => {
            format!("running {other}")
        }
        other => format!("attempting unknown tool {other}"),
    }
}
