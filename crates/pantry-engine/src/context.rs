//! Planning context: what the reasoning capability sees each iteration.
//!
//! Built once per query from the session snapshot, then grown by folding
//! each `ToolResult` in as evidence. Rendering produces a plain message
//! transcript so any `Planner` implementation (or test stub) can consume
//! it without provider-specific structure.

use serde::{Deserialize, Serialize};

use pantry_core::product::ProductRef;
use pantry_core::session::{Role, Session, Turn};
use pantry_core::tool::{ToolPayload, ToolResult, ToolStatus};

/// Passage text longer than this is trimmed in evidence rendering.
const PASSAGE_RENDER_CHARS: usize = 400;

/// One folded tool outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub tool_name: String,
    pub status: ToolStatus,
    pub detail: String,
}

/// A role-tagged message for the planner transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Everything the planner needs for one decision.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    question: String,
    history: Vec<Turn>,
    last_product: Option<ProductRef>,
    evidence: Vec<Evidence>,
}

impl PlanningContext {
    pub fn new(question: impl Into<String>, session: &Session) -> Self {
        Self {
            question: question.into(),
            history: session.turns.clone(),
            last_product: session.last_product.clone(),
            evidence: Vec::new(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn last_product(&self) -> Option<&ProductRef> {
        self.last_product.as_ref()
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// Folds a tool result into the context as evidence.
    pub fn fold(&mut self, result: &ToolResult) {
        self.evidence.push(Evidence {
            tool_name: result.tool_name.clone(),
            status: result.status,
            detail: render_payload(result),
        });
    }

    /// Renders the transcript: prior turns, then one user message holding
    /// the question, the product anchor, and all folded evidence.
    pub fn render_messages(&self) -> Vec<PlannerMessage> {
        let mut messages: Vec<PlannerMessage> = self
            .history
            .iter()
            .map(|turn| PlannerMessage {
                role: match turn.role {
                    Role::User => MessageRole::User,
                    Role::Agent => MessageRole::Assistant,
                },
                content: turn.text.clone(),
            })
            .collect();

        let mut content = self.question.clone();
        if let Some(product) = &self.last_product {
            content.push_str(&format!("\n\nPreviously discussed product: {product}"));
        }
        if !self.evidence.is_empty() {
            content.push_str("\n\nTool evidence gathered so far:");
            for item in &self.evidence {
                content.push_str(&format!(
                    "\n[{} -> {}] {}",
                    item.tool_name, item.status, item.detail
                ));
            }
        }
        messages.push(PlannerMessage {
            role: MessageRole::User,
            content,
        });
        messages
    }
}

/// Evidence rendering is richer than the event summary: the planner needs
/// the actual passage text and product fields, not just counts.
fn render_payload(result: &ToolResult) -> String {
    match &result.payload {
        ToolPayload::Product(record) => {
            let mut lines = vec![record.summary()];
            if !record.categories.is_empty() {
                lines.push(format!("categories: {}", record.categories.join(", ")));
            }
            if !record.ingredients.is_empty() {
                lines.push(format!("ingredients: {}", record.ingredients.join(", ")));
            }
            if !record.allergens.is_empty() {
                let allergens: Vec<&str> =
                    record.allergens.iter().map(String::as_str).collect();
                lines.push(format!("allergens: {}", allergens.join(", ")));
            }
            if !record.nutrients.is_empty() {
                let nutrients: Vec<String> = record
                    .nutrients
                    .iter()
                    .map(|(name, n)| format!("{name} {} {}", n.amount, n.unit))
                    .collect();
                lines.push(format!("nutrients per 100g: {}", nutrients.join("; ")));
            }
            if let Some(grade) = &record.grade {
                lines.push(format!("nutrition grade: {grade}"));
            }
            lines.join("\n  ")
        }
        ToolPayload::Passages(passages) => passages
            .iter()
            .map(|passage| {
                let text: String = passage.text.chars().take(PASSAGE_RENDER_CHARS).collect();
                format!("- ({}) {text}", passage.document_id)
            })
            .collect::<Vec<_>>()
            .join("\n  "),
        other => other.summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::tool::RetrievedPassage;
    use std::time::Duration;

    fn session_with_anchor() -> Session {
        let mut session = Session::new("s1");
        session.turns.push(Turn::user("what is 028400433303?"));
        session.turns.push(Turn::agent("That is Hot Chips by Frito-Lay."));
        session.last_product = Some(ProductRef {
            upc: Some("028400433303".into()),
            name: Some("Hot Chips".into()),
        });
        session
    }

    #[test]
    fn render_includes_history_anchor_and_question() {
        let context = PlanningContext::new("is it gluten free?", &session_with_anchor());
        let messages = context.render_messages();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        let last = &messages[2];
        assert_eq!(last.role, MessageRole::User);
        assert!(last.content.starts_with("is it gluten free?"));
        assert!(last.content.contains("Hot Chips (UPC 028400433303)"));
    }

    #[test]
    fn folded_evidence_appears_in_the_rendered_transcript() {
        let mut context = PlanningContext::new("question", &Session::new("s1"));
        context.fold(&ToolResult::not_found(
            "product-facts-lookup",
            "UPC not catalogued",
            Duration::from_millis(10),
        ));

        let messages = context.render_messages();
        let last = messages.last().unwrap();
        assert!(last.content.contains("Tool evidence gathered so far:"));
        assert!(last.content.contains("[product-facts-lookup -> not found]"));
    }

    #[test]
    fn passage_evidence_carries_text_not_just_counts() {
        let mut context = PlanningContext::new("question", &Session::new("s1"));
        context.fold(&ToolResult::ok(
            "retrieval",
            ToolPayload::Passages(vec![RetrievedPassage {
                document_id: "chips#0".into(),
                text: "Hot Chips are a spicy snack.".into(),
                lexical_score: 1.0,
                semantic_score: 1.0,
                combined_score: 1.0,
            }]),
            Duration::from_millis(5),
        ));

        let rendered = context.render_messages().pop().unwrap().content;
        assert!(rendered.contains("Hot Chips are a spicy snack."));
        assert!(rendered.contains("chips#0"));
    }

    #[test]
    fn no_evidence_no_evidence_block() {
        let context = PlanningContext::new("plain question", &Session::new("s1"));
        let rendered = context.render_messages().pop().unwrap().content;
        assert!(!rendered.contains("Tool evidence"));
    }
}
