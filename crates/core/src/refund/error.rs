//! Refund validation errors.

use rust_decimal::Decimal;
use tally_shared::types::{OrderId, OrderLineId};
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors that can occur while validating a refund request.
#[derive(Debug, Error)]
pub enum RefundError {
    // ========== Validation Errors ==========
    /// A refund must move money, return stock, or both.
    #[error("Refund request has no money amount and no returned lines")]
    EmptyRefund,

    /// The money amount cannot be negative.
    #[error("Refund amount cannot be negative")]
    NegativeAmount,

    /// Returned quantities must be positive.
    #[error("Returned quantity must be positive")]
    NonPositiveQuantity,

    /// The same order line appears twice in one request.
    #[error("Line {0} appears more than once in the refund request")]
    DuplicateLine(OrderLineId),

    /// A check disbursement needs a check number.
    #[error("Check refunds require a check number")]
    MissingCheckNumber,

    // ========== Business Rules ==========
    /// The order is cancelled; its ledger is frozen.
    #[error("Order {0} is cancelled; no further ledger mutation is permitted")]
    OrderCancelled(OrderId),

    /// Money can only be returned out of money actually held.
    #[error("Nothing to refund: no net paid money is held for this order")]
    NothingToRefund,

    /// The money amount exceeds what can still be returned.
    #[error("Refund of {requested} exceeds the recoverable net paid amount {recoverable}")]
    ExceedsRecoverable {
        /// The amount requested.
        requested: Decimal,
        /// Net paid money still held.
        recoverable: Decimal,
    },

    /// Stock can only be returned once it has been issued.
    #[error("Stock cannot be returned on a {status:?} order; issuance happens at completion")]
    StockRefundBeforeCompletion {
        /// The order's current status.
        status: OrderStatus,
    },

    /// The requested line does not belong to the order.
    #[error("Line {0} does not belong to the refunded order")]
    LineNotFound(OrderLineId),

    /// The returned quantity exceeds what the line still holds out.
    #[error("Return of {requested} on line {line_id} exceeds the refundable quantity {refundable}")]
    ExceedsRefundable {
        /// The offending line.
        line_id: OrderLineId,
        /// The quantity requested.
        requested: Decimal,
        /// Quantity still eligible for return.
        refundable: Decimal,
    },

    // ========== Invariant Violations ==========
    /// The payment ledger itself is inconsistent.
    #[error(transparent)]
    Ledger(#[from] crate::order::OrderError),

    /// The line's recorded allocations cover less than its ordered
    /// quantity. Allocations are written when the line is reserved, so a
    /// shortfall means the reservation records are corrupt.
    #[error("Recorded allocations for line {line_id} cover {covered} of {required} units")]
    AllocationShortfall {
        /// The line with broken records.
        line_id: OrderLineId,
        /// Units the recorded allocations cover.
        covered: Decimal,
        /// Units the return distribution needed.
        required: Decimal,
    },
}

impl RefundError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyRefund => "EMPTY_REFUND",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
            Self::DuplicateLine(_) => "DUPLICATE_LINE",
            Self::MissingCheckNumber => "MISSING_CHECK_NUMBER",
            Self::OrderCancelled(_) => "ORDER_CANCELLED",
            Self::NothingToRefund => "NOTHING_TO_REFUND",
            Self::ExceedsRecoverable { .. } => "EXCEEDS_RECOVERABLE",
            Self::StockRefundBeforeCompletion { .. } => "STOCK_REFUND_BEFORE_COMPLETION",
            Self::LineNotFound(_) => "LINE_NOT_FOUND",
            Self::ExceedsRefundable { .. } => "EXCEEDS_REFUNDABLE",
            Self::Ledger(inner) => inner.error_code(),
            Self::AllocationShortfall { .. } => "ALLOCATION_SHORTFALL",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::EmptyRefund
            | Self::NegativeAmount
            | Self::NonPositiveQuantity
            | Self::DuplicateLine(_)
            | Self::MissingCheckNumber => 400,

            // 404 Not Found
            Self::LineNotFound(_) => 404,

            // 422 Unprocessable - business rule failures
            Self::OrderCancelled(_)
            | Self::NothingToRefund
            | Self::ExceedsRecoverable { .. }
            | Self::StockRefundBeforeCompletion { .. }
            | Self::ExceedsRefundable { .. } => 422,

            // 500 Internal - broken records
            Self::Ledger(inner) => inner.http_status_code(),
            Self::AllocationShortfall { .. } => 500,
        }
    }

    /// Returns true if this error signals a broken internal invariant.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        match self {
            Self::AllocationShortfall { .. } => true,
            Self::Ledger(inner) => inner.is_invariant_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(RefundError::EmptyRefund.error_code(), "EMPTY_REFUND");
        assert_eq!(
            RefundError::ExceedsRecoverable {
                requested: dec!(500),
                recoverable: dec!(400),
            }
            .error_code(),
            "EXCEEDS_RECOVERABLE"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(RefundError::EmptyRefund.http_status_code(), 400);
        assert_eq!(
            RefundError::LineNotFound(OrderLineId::new()).http_status_code(),
            404
        );
        assert_eq!(RefundError::NothingToRefund.http_status_code(), 422);
        assert_eq!(
            RefundError::AllocationShortfall {
                line_id: OrderLineId::new(),
                covered: dec!(2),
                required: dec!(3),
            }
            .http_status_code(),
            500
        );
    }

    #[test]
    fn test_invariant_classification() {
        assert!(
            RefundError::AllocationShortfall {
                line_id: OrderLineId::new(),
                covered: dec!(0),
                required: dec!(1),
            }
            .is_invariant_violation()
        );
        assert!(!RefundError::NothingToRefund.is_invariant_violation());
    }
}
