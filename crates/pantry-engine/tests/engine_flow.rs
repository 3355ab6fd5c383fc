//! End-to-end engine flows with real local tools and a scripted planner.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use pantry_core::config::PantryConfig;
use pantry_core::event::EventKind;
use pantry_core::tool::{ToolAdapter, ToolCall, ToolDescriptor};
use pantry_engine::planner::{Planner, PlannerDecision};
use pantry_engine::{PantryEngine, PlanningContext};
use pantry_retrieval::{Corpus, HashEmbedder, HybridRetriever};
use pantry_tools::{CheckDigitAdapter, RetrievalAdapter, UpcValidatorAdapter};

/// Replays a fixed decision script, recording what it saw: the offered
/// tool names and the rendered transcript at each planning step.
struct ScriptedPlanner {
    script: Mutex<Vec<PlannerDecision>>,
    seen: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl ScriptedPlanner {
    fn new(script: Vec<PlannerDecision>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn call(tool: &str, key: &str, value: &str) -> PlannerDecision {
        let mut arguments = Map::new();
        arguments.insert(key.into(), Value::String(value.into()));
        PlannerDecision::ToolCall(ToolCall::new(tool, arguments))
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(
        &self,
        context: &PlanningContext,
        tools: &[ToolDescriptor],
    ) -> pantry_core::Result<PlannerDecision> {
        let tool_names = tools.iter().map(|d| d.name.clone()).collect();
        let transcript = context
            .render_messages()
            .into_iter()
            .map(|message| message.content)
            .collect();
        self.seen.lock().unwrap().push((tool_names, transcript));

        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok(PlannerDecision::FinalAnswer("done".into()))
        } else {
            Ok(script.remove(0))
        }
    }
}

async fn local_tool_belt() -> Vec<Arc<dyn ToolAdapter>> {
    let corpus = Corpus::from_documents(
        vec![(
            "hot_chips".into(),
            "Hot Chips, UPC 028400433303, by Frito-Lay. Ingredients: potatoes, \
             vegetable oil, salt. Contains no wheat ingredients."
                .into(),
        )],
        750,
        100,
    );
    let retriever = HybridRetriever::build(
        corpus,
        Arc::new(HashEmbedder::default()),
        &PantryConfig::default().retrieval,
    )
    .await
    .unwrap();

    vec![
        Arc::new(UpcValidatorAdapter),
        Arc::new(CheckDigitAdapter),
        Arc::new(RetrievalAdapter::new(Arc::new(retriever))),
    ]
}

#[tokio::test]
async fn validate_then_retrieve_then_answer() {
    let planner = ScriptedPlanner::new(vec![
        ScriptedPlanner::call("upc-validate", "upc", "0-28400-43330-3"),
        ScriptedPlanner::call("retrieval", "query", "028400433303 ingredients"),
        PlannerDecision::FinalAnswer(
            "Hot Chips (UPC 028400433303) contain potatoes, vegetable oil, and salt. \
             Source: product knowledge base."
                .into(),
        ),
    ]);
    let engine = PantryEngine::new(
        &PantryConfig::default(),
        planner.clone(),
        local_tool_belt().await,
    );

    let stream = engine
        .handle_query("session-1", "what's in UPC 0-28400-43330-3?")
        .await;
    let events = stream.collect_all().await;

    // Two folds then the final answer, sequence strictly increasing.
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].node_name, "upc-validate");
    assert!(events[0].step_description.contains("ok"));
    assert_eq!(events[1].node_name, "retrieval");
    assert_eq!(events[2].kind, EventKind::Final);
    for pair in events.windows(2) {
        assert!(pair[0].sequence_number < pair[1].sequence_number);
    }

    // The planner saw the full sorted tool belt every iteration.
    let seen = planner.seen.lock().unwrap();
    assert_eq!(
        seen[0].0,
        vec!["retrieval", "upc-check-digit", "upc-validate"]
    );
}

#[tokio::test]
async fn follow_up_sees_the_prior_exchange_in_its_transcript() {
    let planner = ScriptedPlanner::new(vec![
        PlannerDecision::FinalAnswer("Hot Chips is a spicy snack.".into()),
        PlannerDecision::FinalAnswer("They are potato based.".into()),
    ]);
    let engine = PantryEngine::new(
        &PantryConfig::default(),
        planner.clone(),
        local_tool_belt().await,
    );

    engine
        .handle_query("session-2", "tell me about Hot Chips")
        .await
        .collect_all()
        .await;
    engine
        .handle_query("session-2", "what are they made of?")
        .await
        .collect_all()
        .await;

    let seen = planner.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    // First planning step: just the fresh question.
    assert_eq!(seen[0].1.len(), 1);
    // Second query carries both prior turns plus its own question.
    let transcript = &seen[1].1;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[0], "tell me about Hot Chips");
    assert_eq!(transcript[1], "Hot Chips is a spicy snack.");
    assert_eq!(transcript[2], "what are they made of?");
}

#[tokio::test]
async fn checksum_mismatch_is_folded_not_fatal() {
    let planner = ScriptedPlanner::new(vec![
        // Mistyped final digit.
        ScriptedPlanner::call("upc-validate", "upc", "028400433304"),
        ScriptedPlanner::call("upc-check-digit", "upc", "02840043330"),
        PlannerDecision::FinalAnswer(
            "That code fails its checksum; did you mean 028400433303?".into(),
        ),
    ]);
    let engine = PantryEngine::new(
        &PantryConfig::default(),
        planner,
        local_tool_belt().await,
    );

    let events = engine
        .handle_query("session-3", "check 028400433304 for me")
        .await
        .collect_all()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(events.last().unwrap().kind, EventKind::Final);
    // Validation failure is an ok tool invocation, not an error event.
    assert!(events[0].step_description.contains("ok"));
}
