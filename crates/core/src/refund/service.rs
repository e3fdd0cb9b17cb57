//! Refund validation and planning.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{OrderLineId, RefundLineId, RefundTransactionId};

use super::error::RefundError;
use super::types::{BatchReturn, RefundLine, RefundPlan, RefundRequest, RefundTransaction};
use crate::order::{self, Order, OrderLine, OrderStatus, PaymentEntry, PaymentMethod};
use crate::stock::BatchAllocation;

/// Pure refund validation. Produces an immutable plan the database layer
/// applies in one unit of work.
pub struct RefundService;

impl RefundService {
    /// Validates a refund request against the order snapshot.
    ///
    /// The money and stock components are checked independently: money
    /// needs recoverable net paid cash, stock needs issued (Completed)
    /// lines with refundable quantity left. `allocations_for` returns the
    /// batch allocations recorded when a line was reserved; returns are
    /// distributed across them in recorded order, with already-returned
    /// units occupying the front.
    ///
    /// # Errors
    ///
    /// Returns a validation, business-rule, or invariant error; see
    /// [`RefundError`].
    pub fn validate_and_plan<F>(
        order: &Order,
        entries: &[PaymentEntry],
        lines: &[OrderLine],
        request: &RefundRequest,
        allocations_for: F,
    ) -> Result<RefundPlan, RefundError>
    where
        F: Fn(OrderLineId) -> Vec<BatchAllocation>,
    {
        if request.amount < Decimal::ZERO {
            return Err(RefundError::NegativeAmount);
        }
        if request.amount == Decimal::ZERO && request.lines.is_empty() {
            return Err(RefundError::EmptyRefund);
        }
        if order.status.is_terminal() {
            return Err(RefundError::OrderCancelled(order.id));
        }

        if request.amount > Decimal::ZERO {
            if request.method == PaymentMethod::Check && request.check_number.is_none() {
                return Err(RefundError::MissingCheckNumber);
            }
            let recoverable = order::net_cash(order, entries)?;
            if recoverable == Decimal::ZERO {
                return Err(RefundError::NothingToRefund);
            }
            if request.amount > recoverable {
                return Err(RefundError::ExceedsRecoverable {
                    requested: request.amount,
                    recoverable,
                });
            }
        }

        let transaction = RefundTransaction {
            id: RefundTransactionId::new(),
            order_id: order.id,
            amount: request.amount,
            reason: request.reason.clone(),
            requested_by: request.requested_by,
            created_at: Utc::now(),
        };

        let mut refund_lines = Vec::with_capacity(request.lines.len());
        let mut returns = Vec::new();

        if !request.lines.is_empty() {
            if order.status != OrderStatus::Completed {
                return Err(RefundError::StockRefundBeforeCompletion {
                    status: order.status,
                });
            }

            let mut seen = HashSet::new();
            for item in &request.lines {
                if item.quantity <= Decimal::ZERO {
                    return Err(RefundError::NonPositiveQuantity);
                }
                if !seen.insert(item.line_id) {
                    return Err(RefundError::DuplicateLine(item.line_id));
                }

                let line = lines
                    .iter()
                    .find(|l| l.id == item.line_id)
                    .ok_or(RefundError::LineNotFound(item.line_id))?;

                let refundable = line.refundable_quantity();
                if item.quantity > refundable {
                    return Err(RefundError::ExceedsRefundable {
                        line_id: line.id,
                        requested: item.quantity,
                        refundable,
                    });
                }

                // Per-unit gross price including the line's share of tax.
                let gross_unit = line.gross_total() / line.quantity;
                refund_lines.push(RefundLine {
                    id: RefundLineId::new(),
                    refund_id: transaction.id,
                    order_line_id: line.id,
                    quantity: item.quantity,
                    amount: (gross_unit * item.quantity).round_dp(2),
                });

                let allocations = allocations_for(line.id);
                returns.extend(distribute_return(
                    line,
                    item.quantity,
                    &allocations,
                )?);
            }
        }

        Ok(RefundPlan {
            transaction,
            lines: refund_lines,
            returns,
        })
    }
}

/// Maps a returned quantity back to the batches the line drew from.
///
/// Earlier refunds occupy the front of the recorded allocation sequence, so
/// a return of `quantity` units covers positions
/// `[refunded_quantity, refunded_quantity + quantity)` in it. This keeps
/// repeated partial returns deterministic without per-batch refund history.
fn distribute_return(
    line: &OrderLine,
    quantity: Decimal,
    allocations: &[BatchAllocation],
) -> Result<Vec<BatchReturn>, RefundError> {
    let start = line.refunded_quantity;
    let end = start + quantity;

    let mut returns = Vec::new();
    let mut cursor = Decimal::ZERO;
    for allocation in allocations {
        let segment_start = cursor;
        let segment_end = cursor + allocation.quantity;
        cursor = segment_end;

        let take = segment_end.min(end) - segment_start.max(start);
        if take > Decimal::ZERO {
            returns.push(BatchReturn {
                order_line_id: line.id,
                batch_id: allocation.batch_id,
                quantity: take,
            });
        }
    }

    if cursor < end {
        return Err(RefundError::AllocationShortfall {
            line_id: line.id,
            covered: cursor,
            required: end,
        });
    }

    Ok(returns)
}
