//! Order aggregate and ledger-derived payment state.
//!
//! This module implements the financial side of order reconciliation:
//! - Order, line, and payment-ledger domain types
//! - Pure derivations (payment status, net cash, pending amount, overdue)
//! - Payment acceptance with the overpayment bound
//! - Status transitions and the cancellation guard

pub mod error;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::OrderError;
pub use service::{OrderService, ResolvedLine};
pub use state::{DerivedState, derive_state, net_cash, paid_total, refunded_total};
pub use types::{
    CreateOrderInput, Order, OrderKind, OrderLine, OrderLineInput, OrderStatus, OrderTotals,
    PaymentEntry, PaymentEntryType, PaymentInput, PaymentMethod, PaymentStatus, TaxConfig,
};
