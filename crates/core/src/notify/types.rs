//! Notification projection types and the per-order filter.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::OrderId;

use crate::order::{self, Order, OrderError, OrderKind, PaymentEntry};

/// One pending-collection notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueNotification {
    /// The order concerned.
    pub order_id: OrderId,
    /// Sales or purchase.
    pub kind: OrderKind,
    /// Amount still to collect.
    pub remaining_amount: Decimal,
    /// Days until the due date; negative once overdue.
    pub days_until_due: i64,
}

/// Projects one order into a notification, or `None` when nothing is owed.
///
/// Cancelled orders and orders with zero pending amount never notify.
///
/// # Errors
///
/// Returns `NegativeNetCash` when the order's ledger is inconsistent.
pub fn notification_for(
    order: &Order,
    entries: &[PaymentEntry],
    today: NaiveDate,
) -> Result<Option<DueNotification>, OrderError> {
    if order.status.is_terminal() {
        return Ok(None);
    }

    let state = order::derive_state(order, entries, today)?;
    if state.pending_amount == Decimal::ZERO {
        return Ok(None);
    }

    Ok(Some(DueNotification {
        order_id: order.id,
        kind: order.kind,
        remaining_amount: state.pending_amount,
        days_until_due: (order.due_date - today).num_days(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{
        OrderStatus, OrderTotals, PaymentEntryType, PaymentMethod,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_shared::types::{CounterpartyId, PaymentEntryId, UserId};

    fn make_order(total: Decimal, status: OrderStatus, due_date: NaiveDate) -> Order {
        Order {
            id: OrderId::new(),
            kind: OrderKind::Sales,
            counterparty_id: CounterpartyId::new(),
            status,
            totals: OrderTotals {
                subtotal: total,
                vat: dec!(0),
                manufacturing_tax: dec!(0),
                total,
            },
            due_date,
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    fn payment(order_id: OrderId, amount: Decimal) -> PaymentEntry {
        PaymentEntry {
            id: PaymentEntryId::new(),
            order_id,
            entry_type: PaymentEntryType::Payment,
            amount,
            method: PaymentMethod::Cash,
            reference: None,
            check_number: None,
            recorded_by: UserId::new(),
            recorded_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_unpaid_order_notifies_before_due_date() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let order = make_order(dec!(1000), OrderStatus::Pending, due);
        let notification = notification_for(&order, &[], today()).unwrap().unwrap();
        assert_eq!(notification.remaining_amount, dec!(1000));
        assert_eq!(notification.days_until_due, 5);
    }

    #[test]
    fn test_overdue_order_has_negative_days() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let order = make_order(dec!(1000), OrderStatus::Completed, due);
        let entries = vec![payment(order.id, dec!(400))];
        let notification = notification_for(&order, &entries, today()).unwrap().unwrap();
        assert_eq!(notification.remaining_amount, dec!(600));
        assert_eq!(notification.days_until_due, -5);
    }

    #[test]
    fn test_paid_order_never_notifies() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let order = make_order(dec!(1000), OrderStatus::Completed, due);
        let entries = vec![payment(order.id, dec!(1000))];
        assert!(notification_for(&order, &entries, today()).unwrap().is_none());
    }

    #[test]
    fn test_cancelled_order_never_notifies() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let order = make_order(dec!(1000), OrderStatus::Cancelled, due);
        assert!(notification_for(&order, &[], today()).unwrap().is_none());
    }
}
