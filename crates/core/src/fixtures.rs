use chrono::{DateTime, Duration, Utc};

use crate::domain::order::{Order, OrderId, OrderStatus};

/// The three demo orders, with placement dates relative to `now`.
pub fn demo_orders(now: DateTime<Utc>) -> Vec<Order> {
    vec![
        Order {
            id: OrderId::normalize("ORD12345"),
            status: OrderStatus::Shipped,
            placed_at: now - Duration::days(5),
            tracking_number: Some("1Z999AA10123456789".to_string()),
            estimated_delivery: "3 days".to_string(),
        },
        Order {
            id: OrderId::normalize("ORD67890"),
            status: OrderStatus::Delivered,
            placed_at: now - Duration::days(15),
            tracking_number: Some("1Z999AA10198765432".to_string()),
            estimated_delivery: "Delivered 5 days ago".to_string(),
        },
        Order {
            id: OrderId::normalize("ORDABCDE"),
            status: OrderStatus::Processing,
            placed_at: now - Duration::days(1),
            tracking_number: None,
            estimated_delivery: "5-7 business days".to_string(),
        },
    ]
}
