//! Agent orchestration for Pantry.
//!
//! The control loop that answers one food-product question: plan a tool
//! call, execute it with failure isolation, fold the evidence, repeat
//! within a bounded number of iterations, then stream the answer. See
//! [`engine::PantryEngine`] for the single inbound operation.

pub mod context;
pub mod emitter;
pub mod engine;
pub mod orchestrator;
pub mod planner;
pub mod prompts;

pub use context::PlanningContext;
pub use emitter::QueryStream;
pub use engine::PantryEngine;
pub use planner::{ClaudePlanner, Planner, PlannerDecision};
