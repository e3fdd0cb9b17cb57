//! Property-based tests for ledger derivations and payment acceptance.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::OrderService;
use super::state;
use super::types::{
    Order, OrderKind, OrderStatus, OrderTotals, PaymentEntry, PaymentEntryType, PaymentInput,
    PaymentMethod, PaymentStatus,
};
use tally_shared::types::{CounterpartyId, OrderId, PaymentEntryId, UserId};

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn make_order(total: Decimal) -> Order {
    Order {
        id: OrderId::new(),
        kind: OrderKind::Sales,
        counterparty_id: CounterpartyId::new(),
        status: OrderStatus::Pending,
        totals: OrderTotals {
            subtotal: total,
            vat: Decimal::ZERO,
            manufacturing_tax: Decimal::ZERO,
            total,
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

fn cash(amount: Decimal) -> PaymentInput {
    PaymentInput {
        amount,
        method: PaymentMethod::Cash,
        reference: None,
        check_number: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Accepting payments one at a time can never collect more than the
    /// order total, regardless of the attempted amounts.
    #[test]
    fn prop_accepted_payments_never_exceed_total(
        total_cents in 1i64..=10_000_000,
        attempts in prop::collection::vec(1i64..=10_000_000, 0..12),
    ) {
        let order = make_order(cents(total_cents));
        let mut entries = Vec::new();

        for attempt in attempts {
            let payment = cash(cents(attempt));
            if OrderService::accept_payment(&order, &entries, &payment).is_ok() {
                entries.push(make_entry(order.id, PaymentEntryType::Payment, payment.amount));
            }
        }

        prop_assert!(state::paid_total(&entries) <= order.totals.total);
    }

    /// An order is Paid exactly when nothing remains to collect.
    #[test]
    fn prop_paid_iff_pending_zero(
        total_cents in 1i64..=1_000_000,
        paid_cents in 0i64..=2_000_000,
    ) {
        let order = make_order(cents(total_cents));
        let entries = if paid_cents > 0 {
            vec![make_entry(order.id, PaymentEntryType::Payment, cents(paid_cents))]
        } else {
            Vec::new()
        };
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let derived = state::derive_state(&order, &entries, today).unwrap();

        prop_assert_eq!(
            derived.payment_status == PaymentStatus::Paid,
            derived.pending_amount == Decimal::ZERO
        );
    }

    /// Refund entries change net cash but never the collection status or
    /// the pending amount.
    #[test]
    fn prop_refunds_never_downgrade_collection(
        total_cents in 1i64..=1_000_000,
        paid_cents in 1i64..=1_000_000,
        refund_cents in prop::collection::vec(1i64..=1_000_000, 0..6),
    ) {
        let order = make_order(cents(total_cents));
        let mut entries = vec![make_entry(order.id, PaymentEntryType::Payment, cents(paid_cents))];
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let before = state::derive_state(&order, &entries, today).unwrap();

        // Cap each refund at the remaining net, mirroring acceptance rules.
        for cents_amount in refund_cents {
            let net = state::net_cash(&order, &entries).unwrap();
            let amount = cents(cents_amount).min(net);
            if amount > Decimal::ZERO {
                entries.push(make_entry(order.id, PaymentEntryType::Refund, amount));
            }
        }

        let after = state::derive_state(&order, &entries, today).unwrap();
        prop_assert_eq!(after.payment_status, before.payment_status);
        prop_assert_eq!(after.pending_amount, before.pending_amount);
        prop_assert!(after.net_cash >= Decimal::ZERO);
        prop_assert!(after.net_cash <= before.net_cash);
    }

    /// Derived state identity: paid - refunded always equals net cash.
    #[test]
    fn prop_net_cash_identity(
        total_cents in 1i64..=1_000_000,
        paid_cents in 0i64..=1_000_000,
        refunded_cents in 0i64..=1_000_000,
    ) {
        prop_assume!(refunded_cents <= paid_cents);
        let order = make_order(cents(total_cents));
        let mut entries = Vec::new();
        if paid_cents > 0 {
            entries.push(make_entry(order.id, PaymentEntryType::Payment, cents(paid_cents)));
        }
        if refunded_cents > 0 {
            entries.push(make_entry(order.id, PaymentEntryType::Refund, cents(refunded_cents)));
        }
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let derived = state::derive_state(&order, &entries, today).unwrap();

        prop_assert_eq!(derived.net_cash, derived.paid_total - derived.refunded_total);
        prop_assert_eq!(derived.net_cash, cents(paid_cents) - cents(refunded_cents));
    }
}
