//! `SeaORM` entity definitions.

pub mod batches;
pub mod financial_transactions;
pub mod inventory_transactions;
pub mod order_line_allocations;
pub mod order_lines;
pub mod orders;
pub mod payment_entries;
pub mod refund_lines;
pub mod refund_transactions;
pub mod sea_orm_active_enums;
