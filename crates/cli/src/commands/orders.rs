use orderbot_core::backend::InMemoryOrderBackend;
use orderbot_core::policy::{cancellation_eligibility, CancellationEligibility};

pub fn run() -> String {
    render(&InMemoryOrderBackend::with_demo_orders())
}

pub fn render(backend: &InMemoryOrderBackend) -> String {
    let now = backend.now();
    let mut lines = vec!["demo orders (cancellation window applies at call time):".to_string()];

    for order in backend.orders() {
        let days = order.days_since_placed(now);
        let cancellable = match cancellation_eligibility(days) {
            CancellationEligibility::Eligible => "yes".to_string(),
            CancellationEligibility::Ineligible { window_days, .. } => {
                format!("no (outside {window_days}-day window)")
            }
        };
        lines.push(format!(
            "- {id}: status={status} placed={days}d ago tracking={tracking} delivery=\"{delivery}\" cancellable={cancellable}",
            id = order.id,
            status = order.status,
            tracking = order.tracking_number_or_placeholder(),
            delivery = order.estimated_delivery,
        ));
    }

    lines.join("\n")
}
