use std::sync::Arc;
use std::time::Instant;

use orderbot_core::backend::OrderBackend;
use orderbot_core::config::AppConfig;
use orderbot_core::errors::AgentError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::ConversationHistory;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::guardrails::GuardrailPolicy;
use crate::llm::LlmClient;
use crate::planner::Planner;
use crate::responder::Responder;
use crate::tools::{ToolKind, ToolRegistry, ToolResult};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Zero keeps every turn.
    pub max_history_turns: usize,
    pub guardrails: GuardrailPolicy,
}

impl RuntimeOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_history_turns: config.session.max_history_turns,
            guardrails: GuardrailPolicy {
                reject_unknown_parameters: config.session.strict_parameters,
            },
        }
    }
}

/// Which path a turn took through the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPath {
    PlanningFailed,
    DirectReply,
    UnavailableTool,
    ToolInvoked(ToolKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub reply: String,
    pub path: TurnPath,
    /// Set when the turn degraded to a fixed message or a failed tool result.
    pub failure: Option<AgentError>,
}

/// One conversational session: plan, dispatch, respond, remember.
pub struct AgentRuntime {
    planner: Planner,
    dispatcher: Dispatcher,
    responder: Responder,
    history: ConversationHistory,
    session_id: Uuid,
    turns: u64,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        backend: Arc<dyn OrderBackend>,
        options: RuntimeOptions,
    ) -> Self {
        let registry = ToolRegistry::default();
        Self {
            planner: Planner::new(llm.clone(), registry),
            dispatcher: Dispatcher::new(backend, registry, options.guardrails),
            responder: Responder::new(llm),
            history: ConversationHistory::with_max_turns(options.max_history_turns),
            session_id: Uuid::new_v4(),
            turns: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Resolves one user query into a reply. Never fails; every error becomes a message.
    pub async fn handle_turn(&mut self, query: &str) -> TurnReport {
        self.turns += 1;
        let turn = self.turns;
        let correlation_id = self.session_id.to_string();
        let started = Instant::now();
        info!(event_name = "agent.turn.started", correlation_id = %correlation_id, turn, "turn started");

        let report = self.resolve(query).await;

        if let Some(failure) = &report.failure {
            warn!(
                event_name = "agent.turn.degraded",
                correlation_id = %correlation_id,
                turn,
                error_class = failure.error_class(),
                error = %failure,
                "turn resolved with a failure"
            );
        }

        self.history.record_exchange(query, report.reply.clone());
        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            turn,
            path = ?report.path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            history_len = self.history.len(),
            "turn completed"
        );
        report
    }

    async fn resolve(&self, query: &str) -> TurnReport {
        let plan = match self.planner.plan(query, &self.history).await {
            Ok(plan) => plan,
            Err(error) => {
                return TurnReport {
                    reply: error.user_message(),
                    path: TurnPath::PlanningFailed,
                    failure: Some(error),
                }
            }
        };

        match self.dispatcher.dispatch(&plan).await {
            DispatchOutcome::DirectReply(reply) => {
                TurnReport { reply, path: TurnPath::DirectReply, failure: None }
            }
            DispatchOutcome::UnavailableTool(name) => {
                let error = AgentError::UnavailableTool(name);
                TurnReport {
                    reply: error.user_message(),
                    path: TurnPath::UnavailableTool,
                    failure: Some(error),
                }
            }
            DispatchOutcome::ToolInvoked { tool, result } => {
                let backend_failure = match &result {
                    ToolResult::Failure(error) => Some(AgentError::Backend(error.clone())),
                    ToolResult::Success(_) => None,
                };
                match self.responder.respond(query, &result).await {
                    Ok(reply) => TurnReport {
                        reply,
                        path: TurnPath::ToolInvoked(tool),
                        failure: backend_failure,
                    },
                    Err(error) => TurnReport {
                        reply: error.user_message(),
                        path: TurnPath::ToolInvoked(tool),
                        failure: Some(error),
                    },
                }
            }
        }
    }
}

/// `quit` or `exit`, in any case.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use orderbot_core::backend::InMemoryOrderBackend;
    use orderbot_core::config::AppConfig;
    use orderbot_core::errors::{PLANNING_APOLOGY, RESPONSE_APOLOGY};
    use orderbot_core::fixtures::demo_orders;

    use super::{is_exit_command, AgentRuntime, RuntimeOptions, TurnPath};
    use crate::guardrails::GuardrailPolicy;
    use crate::llm::ScriptedLlmClient;

    fn runtime(llm: Arc<ScriptedLlmClient>, max_history_turns: usize) -> AgentRuntime {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).single().expect("valid timestamp");
        let backend = Arc::new(InMemoryOrderBackend::new(demo_orders(now), Arc::new(now)));
        AgentRuntime::new(
            llm,
            backend,
            RuntimeOptions { max_history_turns, ..RuntimeOptions::default() },
        )
    }

    #[test]
    fn exit_commands_ignore_case_and_whitespace() {
        for input in ["quit", "EXIT", " Quit \n"] {
            assert!(is_exit_command(input));
        }
        for input in ["", "quit now", "q"] {
            assert!(!is_exit_command(input));
        }
    }

    #[test]
    fn options_follow_session_config() {
        let mut config = AppConfig::default();
        config.session.max_history_turns = 8;
        assert_eq!(RuntimeOptions::from_config(&config).max_history_turns, 8);
        assert_eq!(RuntimeOptions::from_config(&config).guardrails, GuardrailPolicy::default());

        config.session.strict_parameters = true;
        assert_eq!(RuntimeOptions::from_config(&config).guardrails, GuardrailPolicy::strict());
    }

    #[tokio::test]
    async fn response_failure_still_records_the_exchange() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool_to_use":"OrderTracking","parameters":{"orderId":"ORD12345"}}"#,
        ]));
        let mut runtime = runtime(llm.clone(), 0);

        let report = runtime.handle_turn("Where is ORD12345?").await;

        assert_eq!(report.reply, RESPONSE_APOLOGY);
        assert_eq!(report.failure.map(|error| error.error_class()), Some("response_failure"));
        assert_eq!(runtime.history().len(), 2);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn history_bound_applies_across_turns() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let mut runtime = runtime(llm.clone(), 2);

        for _ in 0..3 {
            llm.push_reply("not json at all");
            let report = runtime.handle_turn("hmm").await;
            assert_eq!(report.path, TurnPath::PlanningFailed);
            assert_eq!(report.reply, PLANNING_APOLOGY);
        }
        assert_eq!(runtime.history().len(), 2);
    }

    #[tokio::test]
    async fn later_prompts_see_earlier_turns() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool_to_use":"none","response_to_user":"Which order would you like to track?"}"#,
            r#"{"tool_to_use":"none","response_to_user":"Thanks!"}"#,
        ]));
        let mut runtime = runtime(llm.clone(), 0);

        runtime.handle_turn("Track my order").await;
        runtime.handle_turn("ORD12345").await;

        let prompts = llm.prompts();
        assert!(prompts[1].contains("user: Track my order"));
        assert!(prompts[1].contains("assistant: Which order would you like to track?"));
    }
}
