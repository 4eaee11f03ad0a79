//! Orderbot Core - domain model, backend contract, and configuration
//!
//! Everything the agent runtime treats as authoritative lives here:
//! - **Domain** (`domain`) - orders, identifiers, statuses
//! - **Policy** (`policy`) - the deterministic cancellation window
//! - **Backend** (`backend`) - the order lookup/cancellation contract and an in-memory store
//! - **Config** (`config`) - layered defaults < file < env < overrides
//!
//! The language model never decides a business outcome. It only picks which
//! backend operation to call; the rules below decide what happens.

pub mod backend;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod policy;

pub use backend::{
    BackendError, CancellationConfirmation, Clock, InMemoryOrderBackend, OrderBackend,
    SystemClock, TrackingInfo,
};
pub use domain::order::{Order, OrderId, OrderStatus};
pub use errors::AgentError;
pub use policy::{cancellation_eligibility, CancellationEligibility, CANCELLATION_WINDOW_DAYS};
