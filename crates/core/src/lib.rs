//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and derivations live
//! here; the database layer persists what these services plan.
//!
//! # Modules
//!
//! - `order` - Order aggregate and ledger-derived payment state
//! - `stock` - Batch ledger, reservation, issuance, and allocation
//! - `refund` - Combined money + stock refund orchestration
//! - `finance` - Financial mirror entries for reporting
//! - `notify` - Due/overdue notification projection

pub mod finance;
pub mod notify;
pub mod order;
pub mod refund;
pub mod stock;
