use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use orderbot_agent::conversation::Role;
use orderbot_agent::tools::ToolKind;
use orderbot_agent::{AgentRuntime, RuntimeOptions, ScriptedLlmClient, TurnPath};
use orderbot_core::backend::{
    BackendError, CancellationConfirmation, InMemoryOrderBackend, OrderBackend, TrackingInfo,
};
use orderbot_core::errors::PLANNING_APOLOGY;
use orderbot_core::fixtures::demo_orders;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).single().expect("valid timestamp")
}

struct RecordingBackend {
    inner: InMemoryOrderBackend,
    calls: AtomicUsize,
}

impl RecordingBackend {
    fn demo() -> Arc<Self> {
        let now = fixed_now();
        Arc::new(Self {
            inner: InMemoryOrderBackend::new(demo_orders(now), Arc::new(now)),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderBackend for RecordingBackend {
    async fn track_order(&self, order_id: &str) -> Result<TrackingInfo, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.track_order(order_id).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<CancellationConfirmation, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_order(order_id).await
    }
}

fn session(llm: &Arc<ScriptedLlmClient>, backend: &Arc<RecordingBackend>) -> AgentRuntime {
    AgentRuntime::new(llm.clone(), backend.clone(), RuntimeOptions::default())
}

#[tokio::test]
async fn status_query_tracks_order_and_mentions_shipped() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"Here is my plan: {"thought":"The user wants the status of ORD12345.","tool_to_use":"OrderTracking","parameters":{"orderId":"ORD12345"},"response_to_user":""}"#,
        "Good news! Order ORD12345 has Shipped and should arrive in 3 days. Tracking number: 1Z999AA10123456789.",
    ]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    let report = runtime.handle_turn("What's the status of ORD12345?").await;

    assert_eq!(report.path, TurnPath::ToolInvoked(ToolKind::OrderTracking));
    assert!(report.failure.is_none());
    assert!(report.reply.contains("Shipped"));
    assert_eq!(backend.calls(), 1);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("\"status\": \"Shipped\""));
    assert!(prompts[1].contains("What's the status of ORD12345?"));
}

#[tokio::test]
async fn stale_cancellation_is_declined_politely() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"thought":"Cancel request; the tool checks eligibility.","tool_to_use":"OrderCancellation","parameters":{"orderId":"ORD67890"},"response_to_user":""}"#,
        "I'm sorry, but order ORD67890 can't be cancelled because it was placed 15 days ago, outside our 10-day cancellation window.",
    ]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    let report = runtime.handle_turn("Cancel order ORD67890").await;

    assert_eq!(report.path, TurnPath::ToolInvoked(ToolKind::OrderCancellation));
    assert_eq!(report.failure.as_ref().map(|error| error.error_class()), Some("backend_failure"));
    assert!(!report.reply.contains('{'));
    assert!(!report.reply.contains("\"success\""));

    let prompts = llm.prompts();
    assert!(prompts[1].contains("Order is not eligible for cancellation."));
    assert!(prompts[1].contains(
        "The order was placed 15 days ago, which is outside the 10-day cancellation window."
    ));
}

#[tokio::test]
async fn planning_failure_apologises_and_records_two_entries() {
    let llm = Arc::new(ScriptedLlmClient::new(["I am not sure what you mean."]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    let report = runtime.handle_turn("asdfgh").await;

    assert_eq!(report.path, TurnPath::PlanningFailed);
    assert_eq!(report.reply, PLANNING_APOLOGY);
    assert_eq!(backend.calls(), 0);

    let turns = runtime.history().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!((turns[0].role, turns[0].content.as_str()), (Role::User, "asdfgh"));
    assert_eq!((turns[1].role, turns[1].content.as_str()), (Role::Assistant, PLANNING_APOLOGY));
}

#[tokio::test]
async fn direct_reply_skips_backend_and_second_model_call() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"thought":"No order id yet.","tool_to_use":"none","parameters":{},"response_to_user":"Sure, which order would you like me to cancel?"}"#,
    ]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    let report = runtime.handle_turn("I want to cancel my order").await;

    assert_eq!(report.path, TurnPath::DirectReply);
    assert_eq!(report.reply, "Sure, which order would you like me to cancel?");
    assert_eq!(backend.calls(), 0);
    assert_eq!(llm.call_count(), 1);
    assert_eq!(runtime.history().len(), 2);
}

#[tokio::test]
async fn unknown_tool_apologises_without_second_model_call() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"thought":"Refund it.","tool_to_use":"RefundOrder","parameters":{"orderId":"ORD12345"},"response_to_user":""}"#,
    ]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    let report = runtime.handle_turn("Refund ORD12345").await;

    assert_eq!(report.path, TurnPath::UnavailableTool);
    assert_eq!(
        report.reply,
        "I'm sorry, I tried to use a tool called 'RefundOrder' but it's not available."
    );
    assert_eq!(backend.calls(), 0);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn follow_up_turn_can_reuse_order_id_from_history() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"tool_to_use":"OrderTracking","parameters":{"orderId":"ORDABCDE"}}"#,
        "Order ORDABCDE is still Processing.",
        r#"{"thought":"Order id ORDABCDE is in the history.","tool_to_use":"OrderCancellation","parameters":{"orderId":"ORDABCDE"}}"#,
        "Done! Order ORDABCDE has been cancelled.",
    ]));
    let backend = RecordingBackend::demo();
    let mut runtime = session(&llm, &backend);

    runtime.handle_turn("Where is ordabcde?").await;
    let report = runtime.handle_turn("Please cancel it").await;

    assert_eq!(report.path, TurnPath::ToolInvoked(ToolKind::OrderCancellation));
    assert!(report.failure.is_none());
    assert_eq!(runtime.history().len(), 4);

    let prompts = llm.prompts();
    assert!(prompts[2].contains("user: Where is ordabcde?"));
    assert!(prompts[2].contains("assistant: Order ORDABCDE is still Processing."));
    assert!(prompts[3].contains("Order ORDABCDE has been successfully cancelled."));
}
