use std::fmt;

use orderbot_core::backend::{BackendError, CancellationConfirmation, TrackingInfo};
use serde_json::{json, Map, Value};

/// The closed set of operations the model may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    OrderTracking,
    OrderCancellation,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::OrderTracking, ToolKind::OrderCancellation];

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderTracking => "OrderTracking",
            Self::OrderCancellation => "OrderCancellation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterType {
    String,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolContract {
    pub kind: ToolKind,
    pub description: &'static str,
    pub parameters: &'static [ParameterSpec],
}

impl ToolContract {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Compact `{ "param": "type" }` schema used in the planning prompt.
    pub fn parameter_schema(&self) -> Value {
        let fields = self
            .parameters
            .iter()
            .map(|spec| (spec.name.to_string(), Value::String(spec.kind.as_str().to_string())))
            .collect::<Map<_, _>>();
        Value::Object(fields)
    }

    pub fn accepts(&self, parameter: &str) -> bool {
        self.parameters.iter().any(|spec| spec.name == parameter)
    }
}

pub const ORDER_ID_PARAMETER: &str = "orderId";

const ORDER_ID: [ParameterSpec; 1] =
    [ParameterSpec { name: ORDER_ID_PARAMETER, kind: ParameterType::String }];

static CONTRACTS: [ToolContract; 2] = [
    ToolContract {
        kind: ToolKind::OrderTracking,
        description: "Use this to get the status of an order.",
        parameters: &ORDER_ID,
    },
    ToolContract {
        kind: ToolKind::OrderCancellation,
        description: "Use this to cancel an order. It also decides whether the order is eligible.",
        parameters: &ORDER_ID,
    },
];

/// Static catalog of tool contracts, fixed for the life of the process.
#[derive(Clone, Copy, Debug)]
pub struct ToolRegistry {
    contracts: &'static [ToolContract],
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self { contracts: &CONTRACTS }
    }
}

impl ToolRegistry {
    /// Unknown names are a normal outcome, not an error.
    pub fn lookup(&self, name: &str) -> Option<&'static ToolContract> {
        let kind = ToolKind::from_name(name)?;
        self.contracts.iter().find(|contract| contract.kind == kind)
    }

    pub fn contracts(&self) -> &'static [ToolContract] {
        self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutput {
    Tracking(TrackingInfo),
    Cancellation(CancellationConfirmation),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolResult {
    Success(ToolOutput),
    Failure(BackendError),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Wire shape handed to the responder prompt.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Success(ToolOutput::Tracking(info)) => json!({
                "success": true,
                "orderId": info.order_id.as_str(),
                "status": info.status.as_str(),
                "trackingNumber": info.tracking_number,
                "estimatedDelivery": info.estimated_delivery,
            }),
            Self::Success(ToolOutput::Cancellation(confirmation)) => json!({
                "success": true,
                "orderId": confirmation.order_id.as_str(),
                "message": confirmation.message,
            }),
            Self::Failure(error) => {
                let mut payload = json!({
                    "success": false,
                    "error": error.to_string(),
                    "category": error.category(),
                });
                if let (Some(reason), Some(fields)) = (error.reason(), payload.as_object_mut()) {
                    fields.insert("reason".to_string(), Value::String(reason));
                }
                payload
            }
        }
    }
}

impl From<Result<TrackingInfo, BackendError>> for ToolResult {
    fn from(result: Result<TrackingInfo, BackendError>) -> Self {
        match result {
            Ok(info) => Self::Success(ToolOutput::Tracking(info)),
            Err(error) => Self::Failure(error),
        }
    }
}

impl From<Result<CancellationConfirmation, BackendError>> for ToolResult {
    fn from(result: Result<CancellationConfirmation, BackendError>) -> Self {
        match result {
            Ok(confirmation) => Self::Success(ToolOutput::Cancellation(confirmation)),
            Err(error) => Self::Failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use orderbot_core::backend::{BackendError, TrackingInfo};
    use orderbot_core::domain::order::{OrderId, OrderStatus};
    use serde_json::json;

    use super::{ToolKind, ToolRegistry, ToolResult};

    #[test]
    fn registry_resolves_known_tools_only() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.lookup("OrderTracking").map(|contract| contract.kind),
            Some(ToolKind::OrderTracking)
        );
        assert_eq!(
            registry.lookup(" OrderCancellation ").map(|contract| contract.kind),
            Some(ToolKind::OrderCancellation)
        );
        assert!(registry.lookup("RefundOrder").is_none());
        assert!(registry.lookup("none").is_none());
    }

    #[test]
    fn contracts_declare_order_id_schema() {
        let registry = ToolRegistry::default();
        for contract in registry.contracts() {
            assert_eq!(contract.parameter_schema(), json!({ "orderId": "string" }));
            assert!(contract.accepts("orderId"));
            assert!(!contract.accepts("order_id"));
        }
    }

    #[test]
    fn success_json_carries_tracking_fields() {
        let result = ToolResult::from(Ok::<_, BackendError>(TrackingInfo {
            order_id: OrderId::normalize("ORD12345"),
            status: OrderStatus::Shipped,
            tracking_number: "1Z999AA10123456789".to_string(),
            estimated_delivery: "3 days".to_string(),
        }));

        assert!(result.is_success());
        assert_eq!(
            result.to_json(),
            json!({
                "success": true,
                "orderId": "ORD12345",
                "status": "Shipped",
                "trackingNumber": "1Z999AA10123456789",
                "estimatedDelivery": "3 days",
            })
        );
    }

    #[test]
    fn failure_json_omits_reason_when_absent() {
        let not_found = ToolResult::Failure(BackendError::OrderNotFound {
            order_id: OrderId::normalize("ORD0"),
        });
        assert_eq!(
            not_found.to_json(),
            json!({ "success": false, "error": "Order not found.", "category": "order_not_found" })
        );

        let ineligible = ToolResult::Failure(BackendError::NotEligible {
            order_id: OrderId::normalize("ORD67890"),
            days_since_order: 15,
            window_days: 10,
        });
        let payload = ineligible.to_json();
        assert_eq!(payload["error"], "Order is not eligible for cancellation.");
        assert!(payload["reason"].as_str().unwrap_or_default().contains("15 days ago"));
    }
}
