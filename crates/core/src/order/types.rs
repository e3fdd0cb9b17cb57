//! Order domain types: the aggregate, its lines, and the payment ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    CounterpartyId, OrderId, OrderLineId, PaymentEntryId, ProductId, UserId,
};

use crate::stock::BatchBinding;

/// Whether an order sells to a customer or purchases from a supplier.
///
/// The two variants are structurally symmetric; only the financial mirror
/// and display labels differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Sale to a customer.
    Sales,
    /// Purchase from a supplier.
    Purchase,
}

impl OrderKind {
    /// The label shown for the completed state: sales orders are "done",
    /// purchase orders are "received".
    #[must_use]
    pub const fn completed_label(self) -> &'static str {
        match self {
            Self::Sales => "done",
            Self::Purchase => "received",
        }
    }
}

/// Order lifecycle status.
///
/// Pending orders hold reservations; completing an order issues them;
/// Cancelled is terminal and reachable only through the cancellation guard,
/// never through a generic status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, stock reserved, not yet issued.
    Pending,
    /// Stock issued ("done" for sales, "received" for purchases).
    Completed,
    /// Terminal. No further ledger mutation is permitted.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further mutation is permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Payment collection status, derived purely from the payment ledger.
///
/// This tracks *collection* progress: it compares the sum of payment-type
/// entries against the order total and deliberately ignores refunds. A fully
/// collected order stays `Paid` even after money is refunded; net retained
/// cash is a separate derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing collected yet.
    Pending,
    /// Some, but not all, of the total collected.
    PartiallyPaid,
    /// The full total (or more) collected.
    Paid,
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Check (carries a check number).
    Check,
}

/// Direction of a payment ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEntryType {
    /// Money collected for the order.
    Payment,
    /// Money returned to the counterparty.
    Refund,
}

/// An immutable record of a single money movement on an order.
///
/// Entries are append-only: no entry is ever edited or deleted. The amount
/// is always stored positive; direction comes from `entry_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    /// The entry ID.
    pub id: PaymentEntryId,
    /// The order the entry belongs to.
    pub order_id: OrderId,
    /// Payment or refund.
    pub entry_type: PaymentEntryType,
    /// The (positive) amount moved.
    pub amount: Decimal,
    /// How the money moved.
    pub method: PaymentMethod,
    /// Optional external reference (e.g. transfer reference).
    pub reference: Option<String>,
    /// Check number when `method` is `Check`.
    pub check_number: Option<String>,
    /// The acting user.
    pub recorded_by: UserId,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Tax configuration applied to an order's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    /// VAT rate as a fraction (e.g. 0.14).
    pub vat_rate: Decimal,
    /// Manufacturing tax rate as a fraction.
    pub manufacturing_tax_rate: Decimal,
}

/// One ordered product with its batch binding and tax breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The line ID.
    pub id: OrderLineId,
    /// The order the line belongs to.
    pub order_id: OrderId,
    /// The ordered product.
    pub product_id: ProductId,
    /// How the line selects its batch(es).
    pub binding: BatchBinding,
    /// The ordered quantity.
    pub quantity: Decimal,
    /// Price per unit before tax.
    pub unit_price: Decimal,
    /// VAT charged on this line.
    pub vat_amount: Decimal,
    /// Manufacturing tax charged on this line.
    pub manufacturing_tax_amount: Decimal,
    /// Quantity already returned through refunds. Never exceeds `quantity`.
    pub refunded_quantity: Decimal,
}

impl OrderLine {
    /// Pre-tax line total.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// Line total including taxes.
    #[must_use]
    pub fn gross_total(&self) -> Decimal {
        self.subtotal() + self.vat_amount + self.manufacturing_tax_amount
    }

    /// Quantity still eligible for a refund return.
    #[must_use]
    pub fn refundable_quantity(&self) -> Decimal {
        self.quantity - self.refunded_quantity
    }
}

/// Computed order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    /// Sum of line VAT amounts.
    pub vat: Decimal,
    /// Sum of line manufacturing tax amounts.
    pub manufacturing_tax: Decimal,
    /// Grand total: subtotal + VAT + manufacturing tax.
    pub total: Decimal,
}

/// The order aggregate header.
///
/// Payment state is never stored on the order; it is always derived from
/// the ledger entries (see `state`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// The order ID.
    pub id: OrderId,
    /// Sales or purchase.
    pub kind: OrderKind,
    /// The customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Computed totals.
    pub totals: OrderTotals,
    /// When the remaining amount falls due.
    pub due_date: NaiveDate,
    /// The user who created the order.
    pub created_by: UserId,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Input for a single order line.
#[derive(Debug, Clone)]
pub struct OrderLineInput {
    /// The ordered product.
    pub product_id: ProductId,
    /// Explicit batch or auto-allocation.
    pub binding: BatchBinding,
    /// The ordered quantity (must be positive).
    pub quantity: Decimal,
    /// Price per unit before tax (must not be negative).
    pub unit_price: Decimal,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// The (positive) amount collected.
    pub amount: Decimal,
    /// How the money moved.
    pub method: PaymentMethod,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Check number when `method` is `Check`.
    pub check_number: Option<String>,
}

/// Input for creating a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    /// Sales or purchase.
    pub kind: OrderKind,
    /// The customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Tax configuration for the order.
    pub tax: TaxConfig,
    /// The ordered lines (must be non-empty).
    pub lines: Vec<OrderLineInput>,
    /// When the remaining amount falls due.
    pub due_date: NaiveDate,
    /// Optional payment collected at creation time.
    pub initial_payment: Option<PaymentInput>,
    /// The user creating the order.
    pub created_by: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_completed_label_per_kind() {
        assert_eq!(OrderKind::Sales.completed_label(), "done");
        assert_eq!(OrderKind::Purchase.completed_label(), "received");
    }

    #[test]
    fn test_only_cancelled_is_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_line_totals() {
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id: OrderId::new(),
            product_id: ProductId::new(),
            binding: BatchBinding::AutoAllocate,
            quantity: dec!(3),
            unit_price: dec!(100),
            vat_amount: dec!(42),
            manufacturing_tax_amount: dec!(3),
            refunded_quantity: dec!(1),
        };
        assert_eq!(line.subtotal(), dec!(300));
        assert_eq!(line.gross_total(), dec!(345));
        assert_eq!(line.refundable_quantity(), dec!(2));
    }
}
