use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order identifiers are case-insensitive; the canonical form is trimmed uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: String,
}

impl Order {
    /// Whole days elapsed since placement, truncated toward zero.
    pub fn days_since_placed(&self, now: DateTime<Utc>) -> i64 {
        (now - self.placed_at).num_days()
    }

    pub fn tracking_number_or_placeholder(&self) -> &str {
        self.tracking_number.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Order, OrderId, OrderStatus};

    #[test]
    fn order_id_normalization_is_case_insensitive() {
        assert_eq!(OrderId::normalize("ord12345"), OrderId::normalize("ORD12345"));
        assert_eq!(OrderId::normalize("  ordabcde ").as_str(), "ORDABCDE");
    }

    #[test]
    fn days_since_placed_truncates_partial_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 20, 12, 0, 0).single().unwrap_or_else(Utc::now);
        let order = Order {
            id: OrderId::normalize("ORD1"),
            status: OrderStatus::Processing,
            placed_at: now - Duration::days(10) - Duration::hours(23),
            tracking_number: None,
            estimated_delivery: "soon".to_string(),
        };

        assert_eq!(order.days_since_placed(now), 10);
        assert_eq!(order.tracking_number_or_placeholder(), "N/A");
    }
}
