//! Refund domain types: the request, the recorded transaction, and the plan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    BatchId, OrderId, OrderLineId, RefundLineId, RefundTransactionId, UserId,
};

use crate::order::PaymentMethod;

/// One returned line item in a refund request.
#[derive(Debug, Clone, Copy)]
pub struct RefundLineRequest {
    /// The order line being returned against.
    pub line_id: OrderLineId,
    /// The quantity returned (must be positive).
    pub quantity: Decimal,
}

/// A refund request as submitted by the caller.
///
/// The money component (`amount`) and the stock component (`lines`) are
/// independent: either may be empty, but not both.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    /// Money to return to the counterparty. Zero means stock-only.
    pub amount: Decimal,
    /// How the money component is disbursed.
    pub method: PaymentMethod,
    /// Check number when `method` is `Check`.
    pub check_number: Option<String>,
    /// Why the refund is issued.
    pub reason: String,
    /// Returned line items. Empty means money-only.
    pub lines: Vec<RefundLineRequest>,
    /// The acting user.
    pub requested_by: UserId,
}

/// The immutable header of a recorded refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundTransaction {
    /// The refund ID.
    pub id: RefundTransactionId,
    /// The order refunded against.
    pub order_id: OrderId,
    /// The money component (zero for stock-only refunds).
    pub amount: Decimal,
    /// Why the refund was issued.
    pub reason: String,
    /// The acting user.
    pub requested_by: UserId,
    /// When the refund was recorded.
    pub created_at: DateTime<Utc>,
}

/// One returned line item within a recorded refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundLine {
    /// The refund line ID.
    pub id: RefundLineId,
    /// The refund this line belongs to.
    pub refund_id: RefundTransactionId,
    /// The order line returned against.
    pub order_line_id: OrderLineId,
    /// The quantity returned.
    pub quantity: Decimal,
    /// The monetary value of the returned quantity at the line's gross
    /// unit price, rounded to 2 decimal places.
    pub amount: Decimal,
}

/// A planned stock return to a specific batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReturn {
    /// The order line the return belongs to.
    pub order_line_id: OrderLineId,
    /// The batch receiving the units back.
    pub batch_id: BatchId,
    /// The quantity returned to this batch.
    pub quantity: Decimal,
}

/// A validated refund, ready to be applied atomically.
#[derive(Debug, Clone)]
pub struct RefundPlan {
    /// The refund header.
    pub transaction: RefundTransaction,
    /// The per-line records.
    pub lines: Vec<RefundLine>,
    /// Batch-level stock returns, in deterministic order.
    pub returns: Vec<BatchReturn>,
}

impl RefundPlan {
    /// True when the plan moves money.
    #[must_use]
    pub fn has_money_component(&self) -> bool {
        self.transaction.amount > Decimal::ZERO
    }

    /// True when the plan returns stock.
    #[must_use]
    pub fn has_stock_component(&self) -> bool {
        !self.returns.is_empty()
    }
}
