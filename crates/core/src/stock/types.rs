//! Batch ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{BatchId, ProductId};

/// How an order line selects the batch its stock comes from.
///
/// A line either binds to a specific batch up front or leaves the choice to
/// the allocation policy, which may split the quantity across several
/// batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "batch_id", rename_all = "snake_case")]
pub enum BatchBinding {
    /// The line is pinned to one specific batch.
    ExplicitBatch(BatchId),
    /// The allocation policy picks eligible batches.
    AutoAllocate,
}

/// A (product, batch-label) pair with its stock counters.
///
/// `reserved` is quantity earmarked for pending orders but not yet removed
/// from `on_hand`. Invariant: `0 <= reserved <= on_hand` at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// The batch ID.
    pub id: BatchId,
    /// The product this batch belongs to.
    pub product_id: ProductId,
    /// Human-readable batch label (e.g. lot number).
    pub label: String,
    /// Physical quantity on hand.
    pub on_hand: Decimal,
    /// Quantity reserved for pending orders.
    pub reserved: Decimal,
    /// When the batch was received into stock.
    pub received_at: DateTime<Utc>,
}

impl Batch {
    /// Quantity available for new reservations.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.on_hand - self.reserved
    }
}

/// The four ways quantity moves through the batch ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementKind {
    /// Earmark quantity for a pending order (`reserved` up).
    Reserve,
    /// Undo a reservation that was never issued (`reserved` down).
    Release,
    /// Physically deplete reserved quantity (`reserved` and `on_hand` down).
    /// Irreversible.
    Issue,
    /// Return refunded quantity to stock (`on_hand` up). Never re-reserves.
    RefundReturn,
}

impl StockMovementKind {
    /// Signed (`on_hand`, `reserved`) deltas for a movement of `quantity`.
    #[must_use]
    pub fn deltas(self, quantity: Decimal) -> (Decimal, Decimal) {
        match self {
            Self::Reserve => (Decimal::ZERO, quantity),
            Self::Release => (Decimal::ZERO, -quantity),
            Self::Issue => (-quantity, -quantity),
            Self::RefundReturn => (quantity, Decimal::ZERO),
        }
    }
}

/// One batch-counter mutation, recorded for the append-only audit log.
///
/// The audit log is a side record, never a second source of truth: batch
/// counters are always read from the batch rows themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// The batch that moved.
    pub batch_id: BatchId,
    /// The product the batch belongs to.
    pub product_id: ProductId,
    /// The kind of movement.
    pub kind: StockMovementKind,
    /// The (positive) quantity moved.
    pub quantity: Decimal,
    /// Signed change applied to `on_hand`.
    pub on_hand_delta: Decimal,
    /// Signed change applied to `reserved`.
    pub reserved_delta: Decimal,
}

/// A (batch, quantity) pair produced by the allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    /// The batch to draw from.
    pub batch_id: BatchId,
    /// The quantity drawn from that batch.
    pub quantity: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn batch(on_hand: Decimal, reserved: Decimal) -> Batch {
        Batch {
            id: BatchId::new(),
            product_id: ProductId::new(),
            label: "LOT-1".to_string(),
            on_hand,
            reserved,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_available_is_on_hand_minus_reserved() {
        assert_eq!(batch(dec!(10), dec!(3)).available(), dec!(7));
        assert_eq!(batch(dec!(5), dec!(5)).available(), dec!(0));
    }

    #[test]
    fn test_reserve_deltas_touch_only_reserved() {
        let (on_hand, reserved) = StockMovementKind::Reserve.deltas(dec!(4));
        assert_eq!(on_hand, dec!(0));
        assert_eq!(reserved, dec!(4));
    }

    #[test]
    fn test_release_deltas_touch_only_reserved() {
        let (on_hand, reserved) = StockMovementKind::Release.deltas(dec!(4));
        assert_eq!(on_hand, dec!(0));
        assert_eq!(reserved, dec!(-4));
    }

    #[test]
    fn test_issue_depletes_both_counters() {
        let (on_hand, reserved) = StockMovementKind::Issue.deltas(dec!(2));
        assert_eq!(on_hand, dec!(-2));
        assert_eq!(reserved, dec!(-2));
    }

    #[test]
    fn test_refund_return_restores_only_on_hand() {
        let (on_hand, reserved) = StockMovementKind::RefundReturn.deltas(dec!(2));
        assert_eq!(on_hand, dec!(2));
        assert_eq!(reserved, dec!(0));
    }
}
