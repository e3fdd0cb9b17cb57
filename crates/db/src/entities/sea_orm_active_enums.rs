//! `SeaORM` active enums mapped to Postgres enum types, with conversions
//! to and from the core domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales or purchase order.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "order_kind")]
pub enum OrderKind {
    /// Sale to a customer.
    #[sea_orm(string_value = "sales")]
    Sales,
    /// Purchase from a supplier.
    #[sea_orm(string_value = "purchase")]
    Purchase,
}

/// Order lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "order_status")]
pub enum OrderStatus {
    /// Created, stock reserved.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Stock issued.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Terminal.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// How a payment was made.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
pub enum PaymentMethod {
    /// Cash.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Bank transfer.
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    /// Check.
    #[sea_orm(string_value = "check")]
    Check,
}

/// Direction of a payment ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_entry_type")]
pub enum PaymentEntryType {
    /// Money collected.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Money returned.
    #[sea_orm(string_value = "refund")]
    Refund,
}

/// How an order line selects its batches.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "binding_mode")]
pub enum BindingMode {
    /// Bound to one explicit batch.
    #[sea_orm(string_value = "explicit_batch")]
    ExplicitBatch,
    /// Split across batches, earliest received first.
    #[sea_orm(string_value = "auto_allocate")]
    AutoAllocate,
}

/// Kind of inventory counter movement.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "stock_movement_kind")]
pub enum StockMovementKind {
    /// Reservation against a pending order.
    #[sea_orm(string_value = "reserve")]
    Reserve,
    /// Release of a reservation.
    #[sea_orm(string_value = "release")]
    Release,
    /// Issuance at completion.
    #[sea_orm(string_value = "issue")]
    Issue,
    /// Return through a refund.
    #[sea_orm(string_value = "refund_return")]
    RefundReturn,
}

/// Reporting classification of a financial mirror entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "financial_kind")]
pub enum FinancialKind {
    /// Money movement on a sales order.
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Money movement on a purchase order.
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<tally_core::order::OrderKind> for OrderKind {
    fn from(kind: tally_core::order::OrderKind) -> Self {
        match kind {
            tally_core::order::OrderKind::Sales => Self::Sales,
            tally_core::order::OrderKind::Purchase => Self::Purchase,
        }
    }
}

impl From<OrderKind> for tally_core::order::OrderKind {
    fn from(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sales => Self::Sales,
            OrderKind::Purchase => Self::Purchase,
        }
    }
}

impl From<tally_core::order::OrderStatus> for OrderStatus {
    fn from(status: tally_core::order::OrderStatus) -> Self {
        match status {
            tally_core::order::OrderStatus::Pending => Self::Pending,
            tally_core::order::OrderStatus::Completed => Self::Completed,
            tally_core::order::OrderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<OrderStatus> for tally_core::order::OrderStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => Self::Pending,
            OrderStatus::Completed => Self::Completed,
            OrderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<tally_core::order::PaymentMethod> for PaymentMethod {
    fn from(method: tally_core::order::PaymentMethod) -> Self {
        match method {
            tally_core::order::PaymentMethod::Cash => Self::Cash,
            tally_core::order::PaymentMethod::BankTransfer => Self::BankTransfer,
            tally_core::order::PaymentMethod::Check => Self::Check,
        }
    }
}

impl From<PaymentMethod> for tally_core::order::PaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::Check => Self::Check,
        }
    }
}

impl From<tally_core::order::PaymentEntryType> for PaymentEntryType {
    fn from(entry_type: tally_core::order::PaymentEntryType) -> Self {
        match entry_type {
            tally_core::order::PaymentEntryType::Payment => Self::Payment,
            tally_core::order::PaymentEntryType::Refund => Self::Refund,
        }
    }
}

impl From<PaymentEntryType> for tally_core::order::PaymentEntryType {
    fn from(entry_type: PaymentEntryType) -> Self {
        match entry_type {
            PaymentEntryType::Payment => Self::Payment,
            PaymentEntryType::Refund => Self::Refund,
        }
    }
}

impl From<tally_core::stock::StockMovementKind> for StockMovementKind {
    fn from(kind: tally_core::stock::StockMovementKind) -> Self {
        match kind {
            tally_core::stock::StockMovementKind::Reserve => Self::Reserve,
            tally_core::stock::StockMovementKind::Release => Self::Release,
            tally_core::stock::StockMovementKind::Issue => Self::Issue,
            tally_core::stock::StockMovementKind::RefundReturn => Self::RefundReturn,
        }
    }
}

impl From<tally_core::finance::FinancialKind> for FinancialKind {
    fn from(kind: tally_core::finance::FinancialKind) -> Self {
        match kind {
            tally_core::finance::FinancialKind::Revenue => Self::Revenue,
            tally_core::finance::FinancialKind::Expense => Self::Expense,
        }
    }
}
