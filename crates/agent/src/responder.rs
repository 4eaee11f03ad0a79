use std::sync::Arc;

use orderbot_core::errors::AgentError;

use crate::llm::LlmClient;
use crate::tools::ToolResult;

/// Phrases a tool result as the final user-facing reply.
pub struct Responder {
    llm: Arc<dyn LlmClient>,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn build_prompt(&self, query: &str, result: &ToolResult) -> String {
        let serialized =
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| "{}".to_string());

        format!(
            "You are a customer service chatbot. A user made a request, a tool was run, and you \
             now have the result of that action.\n\
             Your task is to write a friendly, clear and helpful reply to the user based on the outcome.\n\n\
             - User's Original Request: \"{query}\"\n\
             - Tool Result: {serialized}\n\n\
             Based on this result, write a natural and helpful response.\n\
             - If the action was successful, confirm it clearly.\n\
             - If there was an error (for example order not found or a policy violation), explain it politely.\n\
             - Do not output the raw JSON from the tool result in your response.\n"
        )
    }

    pub async fn respond(&self, query: &str, result: &ToolResult) -> Result<String, AgentError> {
        let prompt = self.build_prompt(query, result);
        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|error| AgentError::Response(error.to_string()))?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AgentError::Response("model returned an empty reply".to_string()));
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orderbot_core::backend::BackendError;
    use orderbot_core::domain::order::OrderId;
    use orderbot_core::errors::AgentError;

    use super::Responder;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::tools::ToolResult;

    fn not_found() -> ToolResult {
        ToolResult::Failure(BackendError::OrderNotFound { order_id: OrderId::normalize("ORD0") })
    }

    #[test]
    fn prompt_carries_query_and_serialized_result() {
        let responder = Responder::new(Arc::new(ScriptedLlmClient::default()));
        let prompt = responder.build_prompt("Where is ORD0?", &not_found());

        assert!(prompt.contains("\"Where is ORD0?\""));
        assert!(prompt.contains("\"error\": \"Order not found.\""));
        assert!(prompt.contains("Do not output the raw JSON"));
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let responder = Responder::new(Arc::new(ScriptedLlmClient::new([
            "  I couldn't find that order.\n",
        ])));
        let reply = responder.respond("Where is ORD0?", &not_found()).await;
        assert_eq!(reply.as_deref(), Ok("I couldn't find that order."));
    }

    #[tokio::test]
    async fn empty_or_failed_replies_are_response_failures() {
        let llm = Arc::new(ScriptedLlmClient::new(["   "]));
        llm.push_error(LlmError::Timeout(std::time::Duration::from_secs(30)));
        let responder = Responder::new(llm);

        for _ in 0..2 {
            let reply = responder.respond("Where is ORD0?", &not_found()).await;
            assert!(matches!(reply, Err(AgentError::Response(_))));
        }
    }
}
