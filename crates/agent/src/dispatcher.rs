use std::sync::Arc;

use orderbot_core::backend::{BackendError, OrderBackend};
use tracing::{info, warn};

use crate::guardrails::GuardrailPolicy;
use crate::planner::ActionPlan;
use crate::tools::{ToolKind, ToolRegistry, ToolResult, ORDER_ID_PARAMETER};

pub const DIRECT_REPLY_FALLBACK: &str = "I'm not sure how to help with that.";

/// Exactly one of these per turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    DirectReply(String),
    UnavailableTool(String),
    ToolInvoked { tool: ToolKind, result: ToolResult },
}

pub struct Dispatcher {
    backend: Arc<dyn OrderBackend>,
    registry: ToolRegistry,
    guardrails: GuardrailPolicy,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn OrderBackend>,
        registry: ToolRegistry,
        guardrails: GuardrailPolicy,
    ) -> Self {
        Self { backend, registry, guardrails }
    }

    pub async fn dispatch(&self, plan: &ActionPlan) -> DispatchOutcome {
        let Some(name) = plan.requested_tool() else {
            let reply = plan.response_to_user.trim();
            let reply = if reply.is_empty() { DIRECT_REPLY_FALLBACK } else { reply };
            return DispatchOutcome::DirectReply(reply.to_string());
        };

        let Some(contract) = self.registry.lookup(name) else {
            warn!(event_name = "agent.dispatch.unavailable_tool", tool = %name, "model requested an unknown tool");
            return DispatchOutcome::UnavailableTool(name.to_string());
        };

        let tool = contract.kind;
        let arguments = match self.guardrails.evaluate(contract, &plan.parameters) {
            Ok(arguments) => arguments,
            Err(error) => {
                warn!(
                    event_name = "agent.dispatch.rejected_parameters",
                    tool = %tool,
                    category = error.category(),
                    "tool parameters failed validation"
                );
                return DispatchOutcome::ToolInvoked { tool, result: ToolResult::Failure(error) };
            }
        };
        if !arguments.ignored().is_empty() {
            warn!(
                event_name = "agent.dispatch.ignored_parameters",
                tool = %tool,
                ignored = ?arguments.ignored(),
                "ignoring parameters the tool does not declare"
            );
        }

        let Some(order_id) = arguments.order_id() else {
            let error = BackendError::MissingParameter {
                operation: tool.name().to_string(),
                parameter: ORDER_ID_PARAMETER.to_string(),
            };
            return DispatchOutcome::ToolInvoked { tool, result: ToolResult::Failure(error) };
        };

        let result = match tool {
            ToolKind::OrderTracking => ToolResult::from(self.backend.track_order(order_id).await),
            ToolKind::OrderCancellation => {
                ToolResult::from(self.backend.cancel_order(order_id).await)
            }
        };

        info!(
            event_name = "agent.dispatch.tool_invoked",
            tool = %tool,
            success = result.is_success(),
            "tool invocation finished"
        );
        DispatchOutcome::ToolInvoked { tool, result }
    }
}
