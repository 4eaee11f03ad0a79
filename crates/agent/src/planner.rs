//! Turns a user query plus conversation context into a structured [`ActionPlan`].

use std::fmt::Write as _;
use std::sync::Arc;

use orderbot_core::errors::AgentError;
use orderbot_core::policy::CANCELLATION_WINDOW_DAYS;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::conversation::ConversationHistory;
use crate::llm::LlmClient;
use crate::tools::ToolRegistry;

const NO_TOOL: &str = "none";

/// The model's decision for one turn.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ActionPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub thought: String,
    #[serde(default)]
    pub tool_to_use: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_to_user: String,
}

impl ActionPlan {
    /// The tool name the model asked for, or `None` for a direct reply.
    pub fn requested_tool(&self) -> Option<&str> {
        self.tool_to_use
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case(NO_TOOL))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Span from the first `{` to the last `}`, if any.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub fn parse_action_plan(raw: &str) -> Result<ActionPlan, AgentError> {
    let span = extract_json_span(raw)
        .ok_or_else(|| AgentError::Planning("no JSON object in model output".to_string()))?;
    serde_json::from_str(span)
        .map_err(|error| AgentError::Planning(format!("invalid action plan: {error}")))
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, registry: ToolRegistry) -> Self {
        Self { llm, registry }
    }

    pub fn build_prompt(&self, query: &str, history: &ConversationHistory) -> String {
        let mut prompt = String::from(
            "You are a helpful and polite customer service chatbot. Your goal is to assist users \
             with their orders by using the tools available to you.\n\
             You have the context of the current conversation. Use it to inform your decisions, \
             such as remembering an order ID the user has already provided.\n\n",
        );

        prompt.push_str("## Conversation History:\n");
        if history.is_empty() {
            prompt.push_str("(no previous messages)\n");
        } else {
            prompt.push_str(&history.render());
            prompt.push('\n');
        }

        prompt.push_str("\n## Available Tools:\n");
        for contract in self.registry.contracts() {
            let _ = writeln!(
                prompt,
                "- `{}`: {}\n  - Parameters: `{}`",
                contract.name(),
                contract.description,
                contract.parameter_schema()
            );
        }

        let _ = write!(
            prompt,
            "\n## Company Policies & Your Rules:\n\
             1. Order Cancellation Policy: you MUST use the `OrderCancellation` tool to check \
             eligibility. The tool enforces the {CANCELLATION_WINDOW_DAYS}-day policy; never decide it yourself.\n\
             2. Use Conversation History: if the user already provided an order ID in a previous \
             message, use it. Do not ask for it again.\n\
             3. Ask for Missing Information: if you need an `orderId` and it is not in the history \
             or the current request, you MUST ask for it.\n\
             4. Only use the tools listed above. If no tool fits, set `tool_to_use` to \"none\".\n"
        );

        let _ = write!(
            prompt,
            "\n## Your Task:\n\
             Based on the user's latest request and the conversation history, respond with a JSON object:\n\
             {{\n  \"thought\": \"Your step-by-step reasoning.\",\n  \
             \"tool_to_use\": \"OrderTracking, OrderCancellation, or none\",\n  \
             \"parameters\": {{}},\n  \
             \"response_to_user\": \"A message for the user ONLY if no tool is used. Otherwise an empty string.\"\n}}\n\n\
             ## User's Latest Request:\n\"{query}\"\n\nYour JSON response:\n"
        );

        prompt
    }

    /// One model call. Transport retries live in the client, never here.
    pub async fn plan(
        &self,
        query: &str,
        history: &ConversationHistory,
    ) -> Result<ActionPlan, AgentError> {
        let prompt = self.build_prompt(query, history);
        let raw = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|error| AgentError::Planning(error.to_string()))?;

        let plan = parse_action_plan(&raw)?;
        debug!(
            event_name = "agent.planner.thought",
            thought = %plan.thought,
            tool = plan.requested_tool().unwrap_or(NO_TOOL),
            "action plan parsed"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orderbot_core::errors::AgentError;
    use serde_json::{json, Map};

    use super::{extract_json_span, parse_action_plan, ActionPlan, Planner};
    use crate::conversation::ConversationHistory;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::tools::ToolRegistry;

    #[test]
    fn embedded_object_is_parsed_exactly() {
        let raw = r#"Sure! {"thought":"user wants status","tool_to_use":"OrderTracking","parameters":{"orderId":"ORD12345"},"response_to_user":""}"#;
        let mut parameters = Map::new();
        parameters.insert("orderId".to_string(), json!("ORD12345"));

        assert_eq!(
            parse_action_plan(raw),
            Ok(ActionPlan {
                thought: "user wants status".to_string(),
                tool_to_use: Some("OrderTracking".to_string()),
                parameters,
                response_to_user: String::new(),
            })
        );
    }

    #[test]
    fn output_without_object_is_a_planning_failure() {
        for raw in ["I can't help with that.", "", "} backwards {"] {
            assert!(matches!(parse_action_plan(raw), Err(AgentError::Planning(_))));
        }
    }

    #[test]
    fn fenced_output_is_isolated() {
        let raw = "```json\n{\"tool_to_use\": \"none\", \"response_to_user\": \"Which order?\"}\n```";
        assert_eq!(
            extract_json_span(raw),
            Some("{\"tool_to_use\": \"none\", \"response_to_user\": \"Which order?\"}")
        );
        let plan = parse_action_plan(raw).expect("fenced plan");
        assert_eq!(plan.requested_tool(), None);
        assert_eq!(plan.response_to_user, "Which order?");
    }

    #[test]
    fn null_fields_fall_back_to_defaults_but_wrong_shapes_fail() {
        let plan = parse_action_plan(r#"{"thought":null,"tool_to_use":null,"parameters":null}"#)
            .expect("nulls are tolerated");
        assert_eq!(plan, ActionPlan::default());

        let wrong = parse_action_plan(r#"{"tool_to_use":"OrderTracking","parameters":"ORD1"}"#);
        assert!(matches!(wrong, Err(AgentError::Planning(_))));
    }

    #[test]
    fn none_and_blank_tool_names_mean_direct_reply() {
        for name in ["none", "None", " NONE ", ""] {
            let plan = ActionPlan { tool_to_use: Some(name.to_string()), ..ActionPlan::default() };
            assert_eq!(plan.requested_tool(), None, "{name:?}");
        }
        let plan =
            ActionPlan { tool_to_use: Some("RefundOrder".to_string()), ..ActionPlan::default() };
        assert_eq!(plan.requested_tool(), Some("RefundOrder"));
    }

    #[test]
    fn prompt_embeds_history_catalog_policies_and_query() {
        let planner = Planner::new(Arc::new(ScriptedLlmClient::default()), ToolRegistry::default());
        let mut history = ConversationHistory::unbounded();
        history.record_exchange("Where is ORD12345?", "It has shipped.");

        let prompt = planner.build_prompt("Cancel it please", &history);
        assert!(prompt.contains("user: Where is ORD12345?\nassistant: It has shipped."));
        assert!(prompt.contains("`OrderTracking`"));
        assert!(prompt.contains(r#"{"orderId":"string"}"#));
        assert!(prompt.contains("10-day policy"));
        assert!(prompt.contains("Do not ask for it again"));
        assert!(prompt.contains("\"Cancel it please\""));
        assert!(prompt.contains("\"response_to_user\""));
    }

    #[tokio::test]
    async fn model_unavailability_is_a_planning_failure() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push_error(LlmError::Unavailable("offline".to_string()));
        let planner = Planner::new(llm.clone(), ToolRegistry::default());

        let outcome = planner.plan("hello", &ConversationHistory::unbounded()).await;
        assert!(matches!(outcome, Err(AgentError::Planning(_))));
        assert_eq!(llm.call_count(), 1);
    }
}
