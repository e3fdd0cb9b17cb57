//! Stock error types for allocation and counter mutations.

use rust_decimal::Decimal;
use tally_shared::types::{BatchId, ProductId};
use thiserror::Error;

/// Errors that can occur during stock operations.
///
/// The invariant variants (`ReservedExceedsOnHand`, `NegativeCounter`,
/// `ReservedUnderflow`) indicate a defect in the orchestration, not a user
/// mistake; callers must surface them loudly instead of correcting state.
#[derive(Debug, Error)]
pub enum StockError {
    // ========== Validation Errors ==========
    /// Movement quantity cannot be zero.
    #[error("Stock movement quantity cannot be zero")]
    ZeroQuantity,

    /// Movement quantity cannot be negative.
    #[error("Stock movement quantity cannot be negative")]
    NegativeQuantity,

    /// The explicitly bound batch holds a different product.
    #[error("Batch {batch_id} does not hold product {product_id}")]
    BatchProductMismatch {
        /// The bound batch.
        batch_id: BatchId,
        /// The product the order line asked for.
        product_id: ProductId,
    },

    // ========== Availability Errors ==========
    /// Not enough available (unreserved) stock to cover the request.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product requested.
        product_id: ProductId,
        /// The quantity requested.
        requested: Decimal,
        /// The quantity actually available.
        available: Decimal,
    },

    // ========== Not Found ==========
    /// Batch not found.
    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    // ========== Invariant Violations ==========
    /// A mutation would leave `reserved > on_hand`.
    #[error("Batch {batch_id} would have reserved {reserved} exceed on-hand {on_hand}")]
    ReservedExceedsOnHand {
        /// The batch concerned.
        batch_id: BatchId,
        /// Resulting reserved quantity.
        reserved: Decimal,
        /// Resulting on-hand quantity.
        on_hand: Decimal,
    },

    /// A mutation would drive a counter below zero.
    #[error("Batch {batch_id} would have a negative {counter} counter ({value})")]
    NegativeCounter {
        /// The batch concerned.
        batch_id: BatchId,
        /// Which counter went negative (`on_hand` or `reserved`).
        counter: &'static str,
        /// The resulting value.
        value: Decimal,
    },

    /// A release or issue asked for more than is currently reserved.
    #[error("Batch {batch_id}: cannot move {requested} out of reservation, only {reserved} reserved")]
    ReservedUnderflow {
        /// The batch concerned.
        batch_id: BatchId,
        /// The quantity the caller tried to move.
        requested: Decimal,
        /// The quantity actually reserved.
        reserved: Decimal,
    },
}

impl StockError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroQuantity => "ZERO_QUANTITY",
            Self::NegativeQuantity => "NEGATIVE_QUANTITY",
            Self::BatchProductMismatch { .. } => "BATCH_PRODUCT_MISMATCH",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::BatchNotFound(_) => "BATCH_NOT_FOUND",
            Self::ReservedExceedsOnHand { .. } => "RESERVED_EXCEEDS_ON_HAND",
            Self::NegativeCounter { .. } => "NEGATIVE_STOCK_COUNTER",
            Self::ReservedUnderflow { .. } => "RESERVED_UNDERFLOW",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::ZeroQuantity | Self::NegativeQuantity | Self::BatchProductMismatch { .. } => 400,

            // 422 Unprocessable - business rule failures
            Self::InsufficientStock { .. } => 422,

            // 404 Not Found
            Self::BatchNotFound(_) => 404,

            // 500 Internal - orchestration defects
            Self::ReservedExceedsOnHand { .. }
            | Self::NegativeCounter { .. }
            | Self::ReservedUnderflow { .. } => 500,
        }
    }

    /// Returns true if this error signals a broken internal invariant.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ReservedExceedsOnHand { .. }
                | Self::NegativeCounter { .. }
                | Self::ReservedUnderflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(StockError::ZeroQuantity.error_code(), "ZERO_QUANTITY");
        assert_eq!(
            StockError::InsufficientStock {
                product_id: ProductId::new(),
                requested: dec!(5),
                available: dec!(2),
            }
            .error_code(),
            "INSUFFICIENT_STOCK"
        );
        assert_eq!(
            StockError::BatchNotFound(BatchId::new()).error_code(),
            "BATCH_NOT_FOUND"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(StockError::NegativeQuantity.http_status_code(), 400);
        assert_eq!(
            StockError::InsufficientStock {
                product_id: ProductId::new(),
                requested: dec!(5),
                available: dec!(2),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            StockError::BatchNotFound(BatchId::new()).http_status_code(),
            404
        );
        assert_eq!(
            StockError::ReservedUnderflow {
                batch_id: BatchId::new(),
                requested: dec!(3),
                reserved: dec!(1),
            }
            .http_status_code(),
            500
        );
    }

    #[test]
    fn test_invariant_classification() {
        assert!(
            StockError::NegativeCounter {
                batch_id: BatchId::new(),
                counter: "on_hand",
                value: dec!(-1),
            }
            .is_invariant_violation()
        );
        assert!(!StockError::ZeroQuantity.is_invariant_violation());
        assert!(
            !StockError::InsufficientStock {
                product_id: ProductId::new(),
                requested: dec!(1),
                available: dec!(0),
            }
            .is_invariant_violation()
        );
    }
}
