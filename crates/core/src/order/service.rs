//! Order service: input validation, totals, payment acceptance, and the
//! transition/cancellation guards.
//!
//! The service is pure. It validates against snapshots the caller loaded;
//! the database layer applies the outcome inside one unit of work.

use rust_decimal::Decimal;

use super::error::OrderError;
use super::state;
use super::types::{
    CreateOrderInput, Order, OrderLine, OrderStatus, OrderTotals, PaymentEntry, PaymentInput,
    PaymentMethod,
};
use crate::stock::BatchBinding;
use tally_shared::types::ProductId;

/// An order line with its tax breakdown resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// The ordered product.
    pub product_id: ProductId,
    /// How the line selects its batch(es).
    pub binding: BatchBinding,
    /// The ordered quantity.
    pub quantity: Decimal,
    /// Price per unit before tax.
    pub unit_price: Decimal,
    /// VAT on this line, rounded to 2 decimal places.
    pub vat_amount: Decimal,
    /// Manufacturing tax on this line, rounded to 2 decimal places.
    pub manufacturing_tax_amount: Decimal,
}

/// Pure order validation and guard logic.
pub struct OrderService;

impl OrderService {
    /// Validates a new order's lines and computes its totals.
    ///
    /// Tax amounts are rounded per line to 2 decimal places using banker's
    /// rounding, and the order totals are sums of the rounded lines.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty orders, non-positive
    /// quantities, negative prices, or negative tax rates.
    pub fn validate_and_total(
        input: &CreateOrderInput,
    ) -> Result<(OrderTotals, Vec<ResolvedLine>), OrderError> {
        if input.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if input.tax.vat_rate < Decimal::ZERO
            || input.tax.manufacturing_tax_rate < Decimal::ZERO
        {
            return Err(OrderError::NegativeTaxRate);
        }
        if let Some(payment) = &input.initial_payment {
            Self::validate_payment_input(payment)?;
        }

        let mut resolved = Vec::with_capacity(input.lines.len());
        let mut subtotal = Decimal::ZERO;
        let mut vat = Decimal::ZERO;
        let mut manufacturing_tax = Decimal::ZERO;

        for line in &input.lines {
            if line.quantity <= Decimal::ZERO {
                return Err(OrderError::NonPositiveQuantity);
            }
            if line.unit_price < Decimal::ZERO {
                return Err(OrderError::NegativePrice);
            }

            let line_subtotal = line.quantity * line.unit_price;
            let vat_amount = (line_subtotal * input.tax.vat_rate).round_dp(2);
            let manufacturing_tax_amount =
                (line_subtotal * input.tax.manufacturing_tax_rate).round_dp(2);

            subtotal += line_subtotal;
            vat += vat_amount;
            manufacturing_tax += manufacturing_tax_amount;

            resolved.push(ResolvedLine {
                product_id: line.product_id,
                binding: line.binding,
                quantity: line.quantity,
                unit_price: line.unit_price,
                vat_amount,
                manufacturing_tax_amount,
            });
        }

        let totals = OrderTotals {
            subtotal,
            vat,
            manufacturing_tax,
            total: subtotal + vat + manufacturing_tax,
        };

        Ok((totals, resolved))
    }

    /// Validates the shape of a payment input.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-positive amounts or a check
    /// payment without a check number.
    pub fn validate_payment_input(payment: &PaymentInput) -> Result<(), OrderError> {
        if payment.amount == Decimal::ZERO {
            return Err(OrderError::ZeroAmount);
        }
        if payment.amount < Decimal::ZERO {
            return Err(OrderError::NegativeAmount);
        }
        if payment.method == PaymentMethod::Check && payment.check_number.is_none() {
            return Err(OrderError::MissingCheckNumber);
        }
        Ok(())
    }

    /// Checks whether a new payment of `amount` may be appended.
    ///
    /// Collected money may never exceed the order total, and a cancelled
    /// order's ledger is frozen.
    ///
    /// # Errors
    ///
    /// Returns `OrderCancelled` on a terminal order and `Overpayment` when
    /// the amount exceeds what is still collectible.
    pub fn accept_payment(
        order: &Order,
        entries: &[PaymentEntry],
        payment: &PaymentInput,
    ) -> Result<(), OrderError> {
        if order.status.is_terminal() {
            return Err(OrderError::OrderCancelled(order.id));
        }
        Self::validate_payment_input(payment)?;

        let collectible = order.totals.total - state::paid_total(entries);
        if payment.amount > collectible {
            return Err(OrderError::Overpayment {
                attempted: payment.amount,
                collectible: collectible.max(Decimal::ZERO),
            });
        }
        Ok(())
    }

    /// Validates a generic status transition.
    ///
    /// Pending → Completed is the only legal generic transition. Cancelled
    /// is never a legal target here: cancellation carries preconditions a
    /// generic update does not perform, so it has its own operation.
    ///
    /// # Errors
    ///
    /// Returns `DirectCancellation` for Cancelled targets and
    /// `InvalidTransition` for everything else outside the lifecycle.
    pub fn validate_transition(order: &Order, target: OrderStatus) -> Result<(), OrderError> {
        if target == OrderStatus::Cancelled {
            return Err(OrderError::DirectCancellation);
        }
        match (order.status, target) {
            (OrderStatus::Pending, OrderStatus::Completed) => Ok(()),
            (from, to) => Err(OrderError::InvalidTransition { from, to }),
        }
    }

    /// The cancellation guard.
    ///
    /// An order may be cancelled only when every paid amount has been
    /// refunded (net cash zero) and, for issued orders, every unit has been
    /// returned. Pending reservations do not block cancellation: releasing
    /// them is part of the cancel operation itself. The guard performs no
    /// mutation; it only verifies that all reversal already happened.
    ///
    /// # Errors
    ///
    /// Returns `OrderCancelled` when already terminal, `CancelWithNetCash`
    /// when money is still held, and `CancelWithOutstandingStock` when an
    /// issued line has unreturned units.
    pub fn validate_cancellation(
        order: &Order,
        entries: &[PaymentEntry],
        lines: &[OrderLine],
    ) -> Result<(), OrderError> {
        if order.status.is_terminal() {
            return Err(OrderError::OrderCancelled(order.id));
        }

        let net = state::net_cash(order, entries)?;
        if net != Decimal::ZERO {
            return Err(OrderError::CancelWithNetCash { net_cash: net });
        }

        if order.status == OrderStatus::Completed {
            for line in lines {
                let outstanding = line.refundable_quantity();
                if outstanding > Decimal::ZERO {
                    return Err(OrderError::CancelWithOutstandingStock {
                        line_id: line.id,
                        outstanding,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::types::{
        OrderKind, OrderLineInput, PaymentEntryType, PaymentStatus, TaxConfig,
    };
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tally_shared::types::{
        CounterpartyId, OrderId, OrderLineId, PaymentEntryId, ProductId, UserId,
    };

    fn make_input(lines: Vec<OrderLineInput>) -> CreateOrderInput {
        CreateOrderInput {
            kind: OrderKind::Sales,
            counterparty_id: CounterpartyId::new(),
            tax: TaxConfig {
                vat_rate: dec!(0.14),
                manufacturing_tax_rate: dec!(0.01),
            },
            lines,
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            initial_payment: None,
            created_by: UserId::new(),
        }
    }

    fn make_line(quantity: Decimal, unit_price: Decimal) -> OrderLineInput {
        OrderLineInput {
            product_id: ProductId::new(),
            binding: BatchBinding::AutoAllocate,
            quantity,
            unit_price,
        }
    }

    fn make_order(total: Decimal, status: OrderStatus) -> Order {
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

    #[test]
    fn test_totals_with_taxes() {
        let input = make_input(vec![make_line(dec!(3), dec!(100))]);
        let (totals, resolved) = OrderService::validate_and_total(&input).unwrap();
        assert_eq!(totals.subtotal, dec!(300));
        assert_eq!(totals.vat, dec!(42.00));
        assert_eq!(totals.manufacturing_tax, dec!(3.00));
        assert_eq!(totals.total, dec!(345.00));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].vat_amount, dec!(42.00));
    }

    #[test]
    fn test_empty_order_rejected() {
        let input = make_input(vec![]);
        assert!(matches!(
            OrderService::validate_and_total(&input),
            Err(OrderError::EmptyOrder)
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let input = make_input(vec![make_line(dec!(0), dec!(100))]);
        assert!(matches!(
            OrderService::validate_and_total(&input),
            Err(OrderError::NonPositiveQuantity)
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let input = make_input(vec![make_line(dec!(1), dec!(-5))]);
        assert!(matches!(
            OrderService::validate_and_total(&input),
            Err(OrderError::NegativePrice)
        ));
    }

    #[test]
    fn test_check_payment_requires_number() {
        let payment = PaymentInput {
            amount: dec!(100),
            method: PaymentMethod::Check,
            reference: None,
            check_number: None,
        };
        assert!(matches!(
            OrderService::validate_payment_input(&payment),
            Err(OrderError::MissingCheckNumber)
        ));
    }

    #[test]
    fn test_payment_within_total_accepted() {
        let order = make_order(dec!(1000), OrderStatus::Pending);
        let entries = vec![make_entry(order.id, PaymentEntryType::Payment, dec!(500))];
        assert!(OrderService::accept_payment(&order, &entries, &cash(dec!(500))).is_ok());
    }

    #[test]
    fn test_overpayment_rejected() {
        let order = make_order(dec!(1000), OrderStatus::Pending);
        let entries = vec![make_entry(order.id, PaymentEntryType::Payment, dec!(500))];
        match OrderService::accept_payment(&order, &entries, &cash(dec!(501))) {
            Err(OrderError::Overpayment {
                attempted,
                collectible,
            }) => {
                assert_eq!(attempted, dec!(501));
                assert_eq!(collectible, dec!(500));
            }
            other => panic!("expected Overpayment, got {other:?}"),
        }
    }

    #[test]
    fn test_refund_does_not_reopen_collectible_room() {
        // A refund lowers net cash but not collection progress, so it never
        // makes room for more payments.
        let order = make_order(dec!(1000), OrderStatus::Completed);
        let entries = vec![
            make_entry(order.id, PaymentEntryType::Payment, dec!(1000)),
            make_entry(order.id, PaymentEntryType::Refund, dec!(400)),
        ];
        assert!(matches!(
            OrderService::accept_payment(&order, &entries, &cash(dec!(100))),
            Err(OrderError::Overpayment { .. })
        ));
    }

    #[test]
    fn test_cancelled_order_rejects_payment() {
        let order = make_order(dec!(1000), OrderStatus::Cancelled);
        assert!(matches!(
            OrderService::accept_payment(&order, &[], &cash(dec!(100))),
            Err(OrderError::OrderCancelled(_))
        ));
    }

    #[test]
    fn test_pending_to_completed_allowed() {
        let order = make_order(dec!(100), OrderStatus::Pending);
        assert!(OrderService::validate_transition(&order, OrderStatus::Completed).is_ok());
    }

    #[test]
    fn test_direct_cancellation_rejected() {
        let order = make_order(dec!(100), OrderStatus::Pending);
        assert!(matches!(
            OrderService::validate_transition(&order, OrderStatus::Cancelled),
            Err(OrderError::DirectCancellation)
        ));
    }

    #[test]
    fn test_completed_to_pending_rejected() {
        let order = make_order(dec!(100), OrderStatus::Completed);
        assert!(matches!(
            OrderService::validate_transition(&order, OrderStatus::Pending),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_pending_unpaid_order_succeeds() {
        let order = make_order(dec!(300), OrderStatus::Pending);
        assert!(OrderService::validate_cancellation(&order, &[], &[]).is_ok());
    }

    #[test]
    fn test_cancel_with_held_money_rejected() {
        let order = make_order(dec!(1000), OrderStatus::Pending);
        let entries = vec![make_entry(order.id, PaymentEntryType::Payment, dec!(500))];
        match OrderService::validate_cancellation(&order, &entries, &[]) {
            Err(OrderError::CancelWithNetCash { net_cash }) => {
                assert_eq!(net_cash, dec!(500));
            }
            other => panic!("expected CancelWithNetCash, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_completed_with_unreturned_stock_rejected() {
        let order = make_order(dec!(300), OrderStatus::Completed);
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id: order.id,
            product_id: ProductId::new(),
            binding: BatchBinding::AutoAllocate,
            quantity: dec!(3),
            unit_price: dec!(100),
            vat_amount: dec!(0),
            manufacturing_tax_amount: dec!(0),
            refunded_quantity: dec!(2),
        };
        assert!(matches!(
            OrderService::validate_cancellation(&order, &[], &[line]),
            Err(OrderError::CancelWithOutstandingStock { .. })
        ));
    }

    #[test]
    fn test_cancel_fully_reversed_completed_order_succeeds() {
        let order = make_order(dec!(1000), OrderStatus::Completed);
        let entries = vec![
            make_entry(order.id, PaymentEntryType::Payment, dec!(1000)),
            make_entry(order.id, PaymentEntryType::Refund, dec!(600)),
            make_entry(order.id, PaymentEntryType::Refund, dec!(400)),
        ];
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id: order.id,
            product_id: ProductId::new(),
            binding: BatchBinding::AutoAllocate,
            quantity: dec!(3),
            unit_price: dec!(100),
            vat_amount: dec!(0),
            manufacturing_tax_amount: dec!(0),
            refunded_quantity: dec!(3),
        };
        assert!(OrderService::validate_cancellation(&order, &entries, &[line]).is_ok());
    }

    /// Full money lifecycle: partial pay, pay off, refund in two steps,
    /// then cancel.
    #[test]
    fn test_pay_refund_cancel_lifecycle() {
        let order = make_order(dec!(1000), OrderStatus::Pending);
        let mut entries = Vec::new();

        OrderService::accept_payment(&order, &entries, &cash(dec!(500))).unwrap();
        entries.push(make_entry(order.id, PaymentEntryType::Payment, dec!(500)));
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let state = state::derive_state(&order, &entries, today).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(state.pending_amount, dec!(500));

        OrderService::accept_payment(&order, &entries, &cash(dec!(500))).unwrap();
        entries.push(make_entry(order.id, PaymentEntryType::Payment, dec!(500)));
        let state = state::derive_state(&order, &entries, today).unwrap();
        assert_eq!(state.payment_status, PaymentStatus::Paid);
        assert_eq!(state.pending_amount, dec!(0));

        let completed = Order {
            status: OrderStatus::Completed,
            ..order.clone()
        };

        entries.push(make_entry(order.id, PaymentEntryType::Refund, dec!(600)));
        let state = state::derive_state(&completed, &entries, today).unwrap();
        assert_eq!(state.net_cash, dec!(400));
        assert_eq!(state.payment_status, PaymentStatus::Paid);

        entries.push(make_entry(order.id, PaymentEntryType::Refund, dec!(400)));
        let state = state::derive_state(&completed, &entries, today).unwrap();
        assert_eq!(state.net_cash, dec!(0));

        let fully_returned_line = OrderLine {
            id: OrderLineId::new(),
            order_id: order.id,
            product_id: ProductId::new(),
            binding: BatchBinding::AutoAllocate,
            quantity: dec!(10),
            unit_price: dec!(100),
            vat_amount: dec!(0),
            manufacturing_tax_amount: dec!(0),
            refunded_quantity: dec!(10),
        };
        assert!(
            OrderService::validate_cancellation(&completed, &entries, &[fully_returned_line])
                .is_ok()
        );
    }
}
