//! Agent Runtime - model-driven intent planning and tool orchestration
//!
//! Each user turn runs a constrained loop:
//! 1. **Planning** (`planner`) - prompt the model with history and the tool
//!    catalog, parse its reply into an `ActionPlan`
//! 2. **Dispatch** (`dispatcher`, `guardrails`) - map the requested tool onto
//!    the closed `ToolKind` set and validate its parameters
//! 3. **Tool Execution** (`tools`) - call the order backend
//! 4. **Response** (`responder`) - ask the model to phrase the tool result
//!
//! `AgentRuntime` owns the conversation history and drives the loop.
//!
//! # Safety Principle
//!
//! The model is strictly a translator. It never decides cancellation
//! eligibility or order state; the backend does.

pub mod conversation;
pub mod dispatcher;
pub mod guardrails;
pub mod llm;
pub mod planner;
pub mod providers;
pub mod responder;
pub mod runtime;
pub mod tools;

pub use llm::{LlmClient, LlmError, ScriptedLlmClient};
pub use providers::build_llm_client;
pub use runtime::{is_exit_command, AgentRuntime, RuntimeOptions, TurnPath, TurnReport};
