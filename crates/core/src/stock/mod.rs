//! Batch ledger and stock movement logic.
//!
//! This module implements the physical side of order reconciliation:
//! - Batch counters (`on_hand`, `reserved`) and their invariants
//! - Deterministic batch allocation for order lines
//! - Reserve / release / issue / refund-return arithmetic
//! - Inventory movement records for the append-only audit log

pub mod allocation;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod allocation_props;

pub use allocation::{AllocationRequest, LineAllocation, plan_reservations};
pub use error::StockError;
pub use service::StockService;
pub use types::{Batch, BatchAllocation, BatchBinding, StockMovement, StockMovementKind};
