//! Financial mirror types and the entry-to-mirror mapping.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{CounterpartyId, FinancialTransactionId, OrderId, PaymentEntryId};

use crate::order::{Order, OrderKind, PaymentEntry, PaymentEntryType};

/// Reporting classification of a financial transaction.
///
/// The kind follows the order, not the direction of the money: a sales
/// refund is negative Revenue, not an Expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialKind {
    /// Money movement on a sales order.
    Revenue,
    /// Money movement on a purchase order.
    Expense,
}

impl From<OrderKind> for FinancialKind {
    fn from(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sales => Self::Revenue,
            OrderKind::Purchase => Self::Expense,
        }
    }
}

/// One mirrored money movement, consumed only by reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialTransaction {
    /// The mirror entry ID.
    pub id: FinancialTransactionId,
    /// The order the movement belongs to.
    pub order_id: OrderId,
    /// The ledger entry this mirrors.
    pub payment_entry_id: PaymentEntryId,
    /// The customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Revenue or Expense, per the order's kind.
    pub kind: FinancialKind,
    /// Signed amount: positive for payments, negative for refunds.
    pub amount: Decimal,
    /// When the mirror was written.
    pub created_at: DateTime<Utc>,
}

/// Builds the mirror entry for an accepted payment-ledger entry.
#[must_use]
pub fn mirror_entry(order: &Order, entry: &PaymentEntry) -> FinancialTransaction {
    let amount = match entry.entry_type {
        PaymentEntryType::Payment => entry.amount,
        PaymentEntryType::Refund => -entry.amount,
    };

    FinancialTransaction {
        id: FinancialTransactionId::new(),
        order_id: order.id,
        payment_entry_id: entry.id,
        counterparty_id: order.counterparty_id,
        kind: order.kind.into(),
        amount,
        created_at: entry.recorded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderStatus, OrderTotals, PaymentMethod};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_shared::types::UserId;

    fn make_order(kind: OrderKind) -> Order {
        Order {
            id: OrderId::new(),
            kind,
            counterparty_id: CounterpartyId::new(),
            status: OrderStatus::Pending,
            totals: OrderTotals {
                subtotal: dec!(1000),
                vat: dec!(0),
                manufacturing_tax: dec!(0),
                total: dec!(1000),
            },
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    fn make_entry(order_id: OrderId, entry_type: PaymentEntryType, amount: Decimal) -> PaymentEntry {
        PaymentEntry {
            id: PaymentEntryId::new(),
            order_id,
            entry_type,
            amount,
            method: PaymentMethod::Cash,
            reference: None,
            check_number: None,
            recorded_by: UserId::new(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_sales_payment_is_positive_revenue() {
        let order = make_order(OrderKind::Sales);
        let entry = make_entry(order.id, PaymentEntryType::Payment, dec!(500));
        let mirror = mirror_entry(&order, &entry);
        assert_eq!(mirror.kind, FinancialKind::Revenue);
        assert_eq!(mirror.amount, dec!(500));
        assert_eq!(mirror.payment_entry_id, entry.id);
    }

    #[test]
    fn test_sales_refund_is_negative_revenue() {
        let order = make_order(OrderKind::Sales);
        let entry = make_entry(order.id, PaymentEntryType::Refund, dec!(200));
        let mirror = mirror_entry(&order, &entry);
        assert_eq!(mirror.kind, FinancialKind::Revenue);
        assert_eq!(mirror.amount, dec!(-200));
    }

    #[test]
    fn test_purchase_payment_is_positive_expense() {
        let order = make_order(OrderKind::Purchase);
        let entry = make_entry(order.id, PaymentEntryType::Payment, dec!(300));
        let mirror = mirror_entry(&order, &entry);
        assert_eq!(mirror.kind, FinancialKind::Expense);
        assert_eq!(mirror.amount, dec!(300));
    }

    #[test]
    fn test_purchase_refund_is_negative_expense() {
        let order = make_order(OrderKind::Purchase);
        let entry = make_entry(order.id, PaymentEntryType::Refund, dec!(150));
        let mirror = mirror_entry(&order, &entry);
        assert_eq!(mirror.kind, FinancialKind::Expense);
        assert_eq!(mirror.amount, dec!(-150));
    }
}
