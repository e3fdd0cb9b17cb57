//! Stock counter arithmetic with invariant enforcement.
//!
//! `StockService` is pure: it takes a batch snapshot and returns the updated
//! snapshot plus the movement record. The database layer applies the result
//! inside the caller's unit of work with a version-guarded update.

use rust_decimal::Decimal;

use super::error::StockError;
use super::types::{Batch, StockMovement, StockMovementKind};

/// Pure batch-counter mutation service.
pub struct StockService;

impl StockService {
    /// Applies a movement of `quantity` to a batch snapshot.
    ///
    /// Returns the updated batch and the movement record for the audit log.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-positive quantities, an
    /// availability error when a reservation does not fit, and an invariant
    /// violation when the mutation would corrupt the counters (these signal
    /// an orchestration defect and must not be swallowed).
    pub fn apply(
        batch: &Batch,
        kind: StockMovementKind,
        quantity: Decimal,
    ) -> Result<(Batch, StockMovement), StockError> {
        if quantity == Decimal::ZERO {
            return Err(StockError::ZeroQuantity);
        }
        if quantity < Decimal::ZERO {
            return Err(StockError::NegativeQuantity);
        }

        match kind {
            StockMovementKind::Reserve => {
                if batch.available() < quantity {
                    return Err(StockError::InsufficientStock {
                        product_id: batch.product_id,
                        requested: quantity,
                        available: batch.available(),
                    });
                }
            }
            StockMovementKind::Release | StockMovementKind::Issue => {
                if batch.reserved < quantity {
                    return Err(StockError::ReservedUnderflow {
                        batch_id: batch.id,
                        requested: quantity,
                        reserved: batch.reserved,
                    });
                }
            }
            StockMovementKind::RefundReturn => {}
        }

        let (on_hand_delta, reserved_delta) = kind.deltas(quantity);
        let updated = Batch {
            on_hand: batch.on_hand + on_hand_delta,
            reserved: batch.reserved + reserved_delta,
            ..batch.clone()
        };

        Self::check_invariants(&updated)?;

        let movement = StockMovement {
            batch_id: batch.id,
            product_id: batch.product_id,
            kind,
            quantity,
            on_hand_delta,
            reserved_delta,
        };

        Ok((updated, movement))
    }

    /// Validates the batch counter invariants after a mutation.
    fn check_invariants(batch: &Batch) -> Result<(), StockError> {
        if batch.on_hand < Decimal::ZERO {
            return Err(StockError::NegativeCounter {
                batch_id: batch.id,
                counter: "on_hand",
                value: batch.on_hand,
            });
        }
        if batch.reserved < Decimal::ZERO {
            return Err(StockError::NegativeCounter {
                batch_id: batch.id,
                counter: "reserved",
                value: batch.reserved,
            });
        }
        if batch.reserved > batch.on_hand {
            return Err(StockError::ReservedExceedsOnHand {
                batch_id: batch.id,
                reserved: batch.reserved,
                on_hand: batch.on_hand,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_shared::types::{BatchId, ProductId};

    fn batch(on_hand: Decimal, reserved: Decimal) -> Batch {
        Batch {
            id: BatchId::new(),
            product_id: ProductId::new(),
            label: "LOT-A".to_string(),
            on_hand,
            reserved,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_reserve_increments_reserved() {
        let (updated, movement) =
            StockService::apply(&batch(dec!(10), dec!(2)), StockMovementKind::Reserve, dec!(3))
                .unwrap();
        assert_eq!(updated.on_hand, dec!(10));
        assert_eq!(updated.reserved, dec!(5));
        assert_eq!(movement.reserved_delta, dec!(3));
        assert_eq!(movement.on_hand_delta, dec!(0));
    }

    #[test]
    fn test_reserve_fails_on_insufficient_availability() {
        let result =
            StockService::apply(&batch(dec!(10), dec!(8)), StockMovementKind::Reserve, dec!(3));
        assert!(matches!(result, Err(StockError::InsufficientStock { .. })));
    }

    #[test]
    fn test_release_leaves_on_hand_untouched() {
        let (updated, _) =
            StockService::apply(&batch(dec!(10), dec!(5)), StockMovementKind::Release, dec!(5))
                .unwrap();
        assert_eq!(updated.on_hand, dec!(10));
        assert_eq!(updated.reserved, dec!(0));
    }

    #[test]
    fn test_release_more_than_reserved_is_invariant_violation() {
        let result =
            StockService::apply(&batch(dec!(10), dec!(2)), StockMovementKind::Release, dec!(3));
        match result {
            Err(err @ StockError::ReservedUnderflow { .. }) => {
                assert!(err.is_invariant_violation());
            }
            other => panic!("expected ReservedUnderflow, got {other:?}"),
        }
    }

    #[test]
    fn test_issue_depletes_both_counters() {
        let (updated, movement) =
            StockService::apply(&batch(dec!(10), dec!(4)), StockMovementKind::Issue, dec!(4))
                .unwrap();
        assert_eq!(updated.on_hand, dec!(6));
        assert_eq!(updated.reserved, dec!(0));
        assert_eq!(movement.on_hand_delta, dec!(-4));
    }

    #[test]
    fn test_issue_unreserved_quantity_fails() {
        let result =
            StockService::apply(&batch(dec!(10), dec!(1)), StockMovementKind::Issue, dec!(2));
        assert!(matches!(result, Err(StockError::ReservedUnderflow { .. })));
    }

    #[test]
    fn test_refund_return_restores_on_hand_only() {
        let (updated, _) = StockService::apply(
            &batch(dec!(6), dec!(0)),
            StockMovementKind::RefundReturn,
            dec!(4),
        )
        .unwrap();
        assert_eq!(updated.on_hand, dec!(10));
        assert_eq!(updated.reserved, dec!(0));
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        let b = batch(dec!(10), dec!(0));
        assert!(matches!(
            StockService::apply(&b, StockMovementKind::Reserve, dec!(0)),
            Err(StockError::ZeroQuantity)
        ));
        assert!(matches!(
            StockService::apply(&b, StockMovementKind::Reserve, dec!(-1)),
            Err(StockError::NegativeQuantity)
        ));
    }
}
