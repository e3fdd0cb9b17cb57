//! Order error types for payment acceptance, transitions, and cancellation.

use rust_decimal::Decimal;
use tally_shared::types::{OrderId, OrderLineId};
use thiserror::Error;

use super::types::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    // ========== Validation Errors ==========
    /// An order must have at least one line.
    #[error("Order must have at least one line")]
    EmptyOrder,

    /// Line quantity must be positive.
    #[error("Line quantity must be positive")]
    NonPositiveQuantity,

    /// Unit price cannot be negative.
    #[error("Unit price cannot be negative")]
    NegativePrice,

    /// Tax rates must be non-negative fractions.
    #[error("Tax rate cannot be negative")]
    NegativeTaxRate,

    /// Payment amount cannot be zero.
    #[error("Payment amount cannot be zero")]
    ZeroAmount,

    /// Payment amount cannot be negative.
    #[error("Payment amount cannot be negative")]
    NegativeAmount,

    /// A check payment needs a check number.
    #[error("Check payments require a check number")]
    MissingCheckNumber,

    // ========== Payment Acceptance ==========
    /// Accepting the payment would push collected money above the total.
    #[error("Payment of {attempted} exceeds the remaining collectible amount {collectible}")]
    Overpayment {
        /// The amount offered.
        attempted: Decimal,
        /// The amount still collectible before hitting the total.
        collectible: Decimal,
    },

    /// The order is cancelled; its ledger is frozen.
    #[error("Order {0} is cancelled; no further ledger mutation is permitted")]
    OrderCancelled(OrderId),

    // ========== Status Transitions ==========
    /// The requested transition is not part of the lifecycle.
    #[error("Cannot transition order from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Cancellation must go through the cancel operation, which checks
    /// preconditions a generic status update does not.
    #[error("Cancellation is a dedicated operation; direct status assignment is rejected")]
    DirectCancellation,

    // ========== Cancellation Guard ==========
    /// The order still holds money that has not been refunded.
    #[error("Cannot cancel: order still holds {net_cash} of unrefunded money")]
    CancelWithNetCash {
        /// Net cash still held.
        net_cash: Decimal,
    },

    /// An issued line still has stock that has not been returned.
    #[error("Cannot cancel: line {line_id} has {outstanding} issued units not yet returned")]
    CancelWithOutstandingStock {
        /// The offending line.
        line_id: OrderLineId,
        /// Issued quantity not yet returned.
        outstanding: Decimal,
    },

    // ========== Invariant Violations ==========
    /// Refunds recorded exceed payments recorded. Refunds are capped at
    /// acceptance time, so this can only come from a ledger-construction
    /// bug.
    #[error("Ledger for order {order_id} has refunds {refunded} exceeding payments {paid}")]
    NegativeNetCash {
        /// The order concerned.
        order_id: OrderId,
        /// Total payments recorded.
        paid: Decimal,
        /// Total refunds recorded.
        refunded: Decimal,
    },
}

impl OrderError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
            Self::NegativePrice => "NEGATIVE_PRICE",
            Self::NegativeTaxRate => "NEGATIVE_TAX_RATE",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::MissingCheckNumber => "MISSING_CHECK_NUMBER",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::OrderCancelled(_) => "ORDER_CANCELLED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DirectCancellation => "DIRECT_CANCELLATION",
            Self::CancelWithNetCash { .. } => "CANCEL_WITH_NET_CASH",
            Self::CancelWithOutstandingStock { .. } => "CANCEL_WITH_OUTSTANDING_STOCK",
            Self::NegativeNetCash { .. } => "NEGATIVE_NET_CASH",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::EmptyOrder
            | Self::NonPositiveQuantity
            | Self::NegativePrice
            | Self::NegativeTaxRate
            | Self::ZeroAmount
            | Self::NegativeAmount
            | Self::MissingCheckNumber
            | Self::InvalidTransition { .. }
            | Self::DirectCancellation => 400,

            // 422 Unprocessable - business rule failures
            Self::Overpayment { .. }
            | Self::OrderCancelled(_)
            | Self::CancelWithNetCash { .. }
            | Self::CancelWithOutstandingStock { .. } => 422,

            // 500 Internal - orchestration defects
            Self::NegativeNetCash { .. } => 500,
        }
    }

    /// Returns true if this error signals a broken internal invariant.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::NegativeNetCash { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(OrderError::EmptyOrder.error_code(), "EMPTY_ORDER");
        assert_eq!(
            OrderError::Overpayment {
                attempted: dec!(100),
                collectible: dec!(50),
            }
            .error_code(),
            "OVERPAYMENT"
        );
        assert_eq!(
            OrderError::DirectCancellation.error_code(),
            "DIRECT_CANCELLATION"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(OrderError::ZeroAmount.http_status_code(), 400);
        assert_eq!(
            OrderError::Overpayment {
                attempted: dec!(100),
                collectible: dec!(50),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            OrderError::NegativeNetCash {
                order_id: OrderId::new(),
                paid: dec!(100),
                refunded: dec!(150),
            }
            .http_status_code(),
            500
        );
    }

    #[test]
    fn test_invariant_classification() {
        assert!(
            OrderError::NegativeNetCash {
                order_id: OrderId::new(),
                paid: dec!(0),
                refunded: dec!(1),
            }
            .is_invariant_violation()
        );
        assert!(
            !OrderError::Overpayment {
                attempted: dec!(1),
                collectible: dec!(0),
            }
            .is_invariant_violation()
        );
    }

    #[test]
    fn test_error_display() {
        let err = OrderError::Overpayment {
            attempted: dec!(600.00),
            collectible: dec!(500.00),
        };
        assert_eq!(
            err.to_string(),
            "Payment of 600.00 exceeds the remaining collectible amount 500.00"
        );
    }
}
