//! The public engine facade.
//!
//! `PantryEngine` owns the long-lived collaborators (session memory, tool
//! dispatcher, planner) and spawns one orchestration task per query,
//! returning the query's event stream to the caller.

use std::sync::Arc;

use tracing::debug;

use pantry_core::config::PantryConfig;
use pantry_core::query::Query;
use pantry_core::session::SessionMemory;
use pantry_core::tool::ToolAdapter;
use pantry_tools::ToolDispatcher;

use crate::emitter::{self, QueryStream};
use crate::orchestrator::Orchestrator;
use crate::planner::Planner;

/// The agentic Q&A engine: one `handle_query` per user question.
#[derive(Clone)]
pub struct PantryEngine {
    orchestrator: Arc<Orchestrator>,
    memory: Arc<SessionMemory>,
}

impl PantryEngine {
    /// Wires the engine from configuration, a planner, and the tool belt.
    pub fn new(
        config: &PantryConfig,
        planner: Arc<dyn Planner>,
        adapters: Vec<Arc<dyn ToolAdapter>>,
    ) -> Self {
        let memory = Arc::new(SessionMemory::new(config.session.clone()));
        let mut dispatcher = ToolDispatcher::new(&config.engine);
        for adapter in adapters {
            dispatcher.register(adapter);
        }
        let orchestrator = Arc::new(Orchestrator::new(
            planner,
            Arc::new(dispatcher),
            memory.clone(),
            config.engine.clone(),
        ));
        Self {
            orchestrator,
            memory,
        }
    }

    /// Handles one user question.
    ///
    /// Returns immediately with the query's event stream; the
    /// orchestration runs on its own task. Dropping the stream cancels
    /// the run after any in-flight tool call settles.
    pub async fn handle_query(&self, session_id: &str, text: &str) -> QueryStream {
        // Opportunistic idle-session sweep, throttled internally.
        self.memory.evict_idle().await;

        let query = Query::new(session_id, text);
        debug!(query = %query.id, session = session_id, "accepted query");

        let (publisher, stream) = emitter::channel();
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.run(query, publisher).await;
        });
        stream
    }

    /// Number of live sessions (diagnostics).
    pub async fn session_count(&self) -> usize {
        self.memory.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PlanningContext;
    use crate::planner::PlannerDecision;
    use async_trait::async_trait;
    use pantry_core::event::EventKind;
    use pantry_core::tool::ToolDescriptor;

    struct EchoPlanner;

    #[async_trait]
    impl Planner for EchoPlanner {
        async fn plan(
            &self,
            context: &PlanningContext,
            _tools: &[ToolDescriptor],
        ) -> pantry_core::Result<PlannerDecision> {
            Ok(PlannerDecision::FinalAnswer(format!(
                "echo: {}",
                context.question()
            )))
        }
    }

    #[tokio::test]
    async fn handle_query_streams_a_final_answer() {
        let engine = PantryEngine::new(&PantryConfig::default(), Arc::new(EchoPlanner), vec![]);
        let stream = engine.handle_query("s1", "hello there").await;
        let events = stream.collect_all().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Final);
        assert_eq!(events[0].step_description, "echo: hello there");
        assert_eq!(engine.session_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_queries_each_get_their_own_stream() {
        let engine = PantryEngine::new(&PantryConfig::default(), Arc::new(EchoPlanner), vec![]);
        let stream_a = engine.handle_query("s1", "first").await;
        let stream_b = engine.handle_query("s1", "second").await;

        let (events_a, events_b) =
            tokio::join!(stream_a.collect_all(), stream_b.collect_all());
        assert_eq!(events_a.last().unwrap().step_description, "echo: first");
        assert_eq!(events_b.last().unwrap().step_description, "echo: second");

        // Both exchanges landed in the same session, serialized.
        let engine_memory = engine.memory.load("s1").await;
        assert_eq!(engine_memory.turns.len(), 4);
    }
}
