//! Pure derivations over the payment ledger.
//!
//! Payment state is never stored authoritatively on the order. Every value
//! here is a function of the append-only ledger entries and the order
//! total, so reading it twice without a mutation in between always yields
//! the same result.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::OrderError;
use super::types::{Order, PaymentEntry, PaymentEntryType, PaymentStatus};

/// The full derived financial state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DerivedState {
    /// Collection status (ignores refunds).
    pub payment_status: PaymentStatus,
    /// Sum of payment-type entries.
    pub paid_total: Decimal,
    /// Sum of refund-type entries.
    pub refunded_total: Decimal,
    /// `paid_total - refunded_total`; money currently held.
    pub net_cash: Decimal,
    /// `max(0, total - paid_total)`; collection still outstanding.
    /// Refunds do not restore it.
    pub pending_amount: Decimal,
    /// `max(0, net_cash - total)`; money held in excess of the total.
    pub refund_due: Decimal,
    /// True when the due date has passed and collection is incomplete.
    pub is_overdue: bool,
    /// The pending amount that is already past due (zero when not overdue).
    pub deserved_amount: Decimal,
}

/// Sum of payment-type entry amounts.
#[must_use]
pub fn paid_total(entries: &[PaymentEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.entry_type == PaymentEntryType::Payment)
        .map(|e| e.amount)
        .sum()
}

/// Sum of refund-type entry amounts.
#[must_use]
pub fn refunded_total(entries: &[PaymentEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.entry_type == PaymentEntryType::Refund)
        .map(|e| e.amount)
        .sum()
}

/// Net cash held for an order: payments minus refunds.
///
/// # Errors
///
/// Returns `NegativeNetCash` if refunds exceed payments. Refunds are capped
/// at acceptance time, so a negative value signals a ledger-construction
/// defect and must fail loudly rather than be clamped.
pub fn net_cash(order: &Order, entries: &[PaymentEntry]) -> Result<Decimal, OrderError> {
    let paid = paid_total(entries);
    let refunded = refunded_total(entries);
    let net = paid - refunded;
    if net < Decimal::ZERO {
        return Err(OrderError::NegativeNetCash {
            order_id: order.id,
            paid,
            refunded,
        });
    }
    Ok(net)
}

/// Collection status from the paid total alone. Refunds never downgrade it.
#[must_use]
pub fn payment_status(paid: Decimal, total: Decimal) -> PaymentStatus {
    if paid == Decimal::ZERO {
        PaymentStatus::Pending
    } else if paid >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    }
}

/// Derives the full financial state of an order as of `today`.
///
/// # Errors
///
/// Returns `NegativeNetCash` when the ledger is internally inconsistent.
pub fn derive_state(
    order: &Order,
    entries: &[PaymentEntry],
    today: NaiveDate,
) -> Result<DerivedState, OrderError> {
    let paid = paid_total(entries);
    let refunded = refunded_total(entries);
    let net = net_cash(order, entries)?;
    let total = order.totals.total;

    let status = payment_status(paid, total);
    let pending_amount = (total - paid).max(Decimal::ZERO);
    let refund_due = (net - total).max(Decimal::ZERO);
    let is_overdue = order.due_date < today && status != PaymentStatus::Paid;
    let deserved_amount = if is_overdue {
        pending_amount
    } else {
        Decimal::ZERO
    };

    Ok(DerivedState {
        payment_status: status,
        paid_total: paid,
        refunded_total: refunded,
        net_cash: net,
        pending_amount,
        refund_due,
        is_overdue,
        deserved_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::types::{OrderKind, OrderStatus, OrderTotals, PaymentMethod};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_shared::types::{CounterpartyId, OrderId, PaymentEntryId, UserId};

    fn order(total: Decimal, due_date: NaiveDate) -> Order {
        Order {
            id: OrderId::new(),
            kind: OrderKind::Sales,
            counterparty_id: CounterpartyId::new(),
            status: OrderStatus::Pending,
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

    fn entry(order_id: OrderId, entry_type: PaymentEntryType, amount: Decimal) -> PaymentEntry {
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn future() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()
    }

    fn past() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
    }

    #[test]
    fn test_empty_ledger_is_pending() {
        let order = order(dec!(1000), future());
        let state = derive_state(&order, &[], today()).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::Pending);
        assert_eq!(state.pending_amount, dec!(1000));
        assert_eq!(state.net_cash, dec!(0));
    }

    #[test]
    fn test_partial_payment() {
        let order = order(dec!(1000), future());
        let entries = vec![entry(order.id, PaymentEntryType::Payment, dec!(500))];
        let state = derive_state(&order, &entries, today()).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(state.pending_amount, dec!(500));
    }

    #[test]
    fn test_full_payment_is_paid_with_zero_pending() {
        let order = order(dec!(1000), future());
        let entries = vec![
            entry(order.id, PaymentEntryType::Payment, dec!(500)),
            entry(order.id, PaymentEntryType::Payment, dec!(500)),
        ];
        let state = derive_state(&order, &entries, today()).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::Paid);
        assert_eq!(state.pending_amount, dec!(0));
    }

    #[test]
    fn test_refund_does_not_downgrade_status_or_restore_pending() {
        let order = order(dec!(1000), future());
        let entries = vec![
            entry(order.id, PaymentEntryType::Payment, dec!(1000)),
            entry(order.id, PaymentEntryType::Refund, dec!(600)),
        ];
        let state = derive_state(&order, &entries, today()).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::Paid);
        assert_eq!(state.pending_amount, dec!(0));
        assert_eq!(state.net_cash, dec!(400));
    }

    #[test]
    fn test_refund_due_when_net_cash_exceeds_total() {
        // Totals can shrink after collection (e.g. a line refund adjusts the
        // order); the excess held is surfaced as refund_due.
        let mut order = order(dec!(1000), future());
        let entries = vec![entry(order.id, PaymentEntryType::Payment, dec!(1000))];
        order.totals.total = dec!(800);
        let state = derive_state(&order, &entries, today()).unwrap();
        assert_eq!(state.refund_due, dec!(200));
    }

    #[test]
    fn test_negative_net_cash_fails_loudly() {
        let order = order(dec!(1000), future());
        let entries = vec![
            entry(order.id, PaymentEntryType::Payment, dec!(100)),
            entry(order.id, PaymentEntryType::Refund, dec!(200)),
        ];
        let result = derive_state(&order, &entries, today());
        assert!(matches!(result, Err(OrderError::NegativeNetCash { .. })));
    }

    #[test]
    fn test_overdue_requires_unpaid_and_past_due() {
        let order_past_due = order(dec!(1000), past());
        let state = derive_state(&order_past_due, &[], today()).unwrap();
        assert!(state.is_overdue);
        assert_eq!(state.deserved_amount, dec!(1000));

        let entries = vec![entry(order_past_due.id, PaymentEntryType::Payment, dec!(1000))];
        let state = derive_state(&order_past_due, &entries, today()).unwrap();
        assert!(!state.is_overdue);
        assert_eq!(state.deserved_amount, dec!(0));
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let order = order(dec!(1000), today());
        let state = derive_state(&order, &[], today()).unwrap();
        assert!(!state.is_overdue);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let order = order(dec!(1000), past());
        let entries = vec![
            entry(order.id, PaymentEntryType::Payment, dec!(700)),
            entry(order.id, PaymentEntryType::Refund, dec!(200)),
        ];
        let first = derive_state(&order, &entries, today()).unwrap();
        let second = derive_state(&order, &entries, today()).unwrap();
        assert_eq!(first, second);
    }
}
