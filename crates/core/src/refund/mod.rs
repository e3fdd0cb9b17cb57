//! Refund orchestration.
//!
//! A refund request combines a money component (a new Refund ledger entry)
//! and a stock component (returned quantities per order line). Validation
//! produces an immutable plan; applying it is the database layer's job.

pub mod error;
pub mod service;
pub mod types;

pub use error::RefundError;
pub use service::RefundService;
pub use types::{
    BatchReturn, RefundLine, RefundLineRequest, RefundPlan, RefundRequest, RefundTransaction,
};
