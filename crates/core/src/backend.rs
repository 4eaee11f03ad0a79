use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::fixtures;
use crate::policy::{cancellation_eligibility, CancellationEligibility};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackingInfo {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub tracking_number: String,
    pub estimated_delivery: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CancellationConfirmation {
    pub order_id: OrderId,
    pub message: String,
}

/// Domain-level failures reported by the order backend.
///
/// The display text is the short user-safe error; `reason` carries the detail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Order not found.")]
    OrderNotFound { order_id: OrderId },
    #[error("Order is not eligible for cancellation.")]
    NotEligible { order_id: OrderId, days_since_order: i64, window_days: i64 },
    #[error("Missing required parameter `{parameter}`.")]
    MissingParameter { operation: String, parameter: String },
    #[error("Parameter `{parameter}` must be a {expected}.")]
    InvalidParameter { operation: String, parameter: String, expected: &'static str },
    #[error("Unexpected parameter `{parameter}`.")]
    UnexpectedParameter { operation: String, parameter: String },
}

impl BackendError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::OrderNotFound { .. } => "order_not_found",
            Self::NotEligible { .. } => "not_eligible",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::UnexpectedParameter { .. } => "unexpected_parameter",
        }
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::NotEligible { days_since_order, window_days, .. } => Some(format!(
                "The order was placed {days_since_order} days ago, which is outside the {window_days}-day cancellation window."
            )),
            Self::MissingParameter { operation, parameter } => {
                Some(format!("`{operation}` requires `{parameter}` but it was not provided."))
            }
            Self::InvalidParameter { operation, parameter, expected } => {
                Some(format!("`{operation}` expects `{parameter}` to be a {expected}."))
            }
            Self::UnexpectedParameter { operation, parameter } => {
                Some(format!("`{operation}` does not accept `{parameter}`."))
            }
            Self::OrderNotFound { .. } => None,
        }
    }
}

#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn track_order(&self, order_id: &str) -> Result<TrackingInfo, BackendError>;
    async fn cancel_order(&self, order_id: &str)
        -> Result<CancellationConfirmation, BackendError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Clock for DateTime<Utc> {
    fn now(&self) -> DateTime<Utc> {
        *self
    }
}

/// In-process stand-in for the order database.
#[derive(Clone)]
pub struct InMemoryOrderBackend {
    orders: HashMap<OrderId, Order>,
    clock: Arc<dyn Clock>,
}

impl InMemoryOrderBackend {
    pub fn new(orders: Vec<Order>, clock: Arc<dyn Clock>) -> Self {
        let orders = orders.into_iter().map(|order| (order.id.clone(), order)).collect();
        Self { orders, clock }
    }

    /// Demo store whose placement dates are relative to process start.
    pub fn with_demo_orders() -> Self {
        Self::new(fixtures::demo_orders(Utc::now()), Arc::new(SystemClock))
    }

    pub fn orders(&self) -> Vec<&Order> {
        let mut orders = self.orders.values().collect::<Vec<_>>();
        orders.sort_by(|left, right| left.id.cmp(&right.id));
        orders
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn find(&self, raw_order_id: &str) -> Result<&Order, BackendError> {
        let order_id = OrderId::normalize(raw_order_id);
        self.orders.get(&order_id).ok_or(BackendError::OrderNotFound { order_id })
    }
}

#[async_trait]
impl OrderBackend for InMemoryOrderBackend {
    async fn track_order(&self, order_id: &str) -> Result<TrackingInfo, BackendError> {
        info!(event_name = "backend.order_tracking.called", order_id = %order_id, "order tracking requested");
        let order = self.find(order_id)?;

        Ok(TrackingInfo {
            order_id: order.id.clone(),
            status: order.status,
            tracking_number: order.tracking_number_or_placeholder().to_string(),
            estimated_delivery: order.estimated_delivery.clone(),
        })
    }

    async fn cancel_order(
        &self,
        order_id: &str,
    ) -> Result<CancellationConfirmation, BackendError> {
        info!(event_name = "backend.order_cancellation.called", order_id = %order_id, "order cancellation requested");
        let order = self.find(order_id)?;

        match cancellation_eligibility(order.days_since_placed(self.clock.now())) {
            CancellationEligibility::Eligible => Ok(CancellationConfirmation {
                order_id: order.id.clone(),
                message: format!("Order {} has been successfully cancelled.", order.id),
            }),
            CancellationEligibility::Ineligible { days_since_order, window_days } => {
                Err(BackendError::NotEligible {
                    order_id: order.id.clone(),
                    days_since_order,
                    window_days,
                })
            }
        }
    }
}
