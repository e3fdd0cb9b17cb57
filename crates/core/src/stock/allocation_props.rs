//! Property-based tests for batch allocation and counter arithmetic.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{BatchId, OrderLineId, ProductId};

use super::allocation::{AllocationRequest, plan_reservations};
use super::service::StockService;
use super::types::{Batch, BatchBinding, StockMovementKind};

/// Strategy for small positive quantities (2 decimal places).
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for a product's batch snapshot: (on_hand, reserved) pairs with
/// reserved <= on_hand.
fn batch_counters_strategy() -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
    prop::collection::vec(
        (0i64..10_000i64).prop_flat_map(|on_hand| {
            (0i64..=on_hand).prop_map(move |reserved| {
                (Decimal::new(on_hand, 2), Decimal::new(reserved, 2))
            })
        }),
        1..6,
    )
}

fn make_batches(product_id: ProductId, counters: &[(Decimal, Decimal)]) -> Vec<Batch> {
    counters
        .iter()
        .enumerate()
        .map(|(i, &(on_hand, reserved))| Batch {
            id: BatchId::new(),
            product_id,
            label: format!("LOT-{i}"),
            on_hand,
            reserved,
            #[allow(clippy::cast_possible_wrap)]
            received_at: Utc::now() - Duration::days(i as i64),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An auto-allocation plan always sums to the requested quantity and
    /// never draws more from a batch than that batch has available.
    #[test]
    fn prop_allocation_covers_request_within_availability(
        counters in batch_counters_strategy(),
        quantity in quantity_strategy(),
    ) {
        let product_id = ProductId::new();
        let batches = make_batches(product_id, &counters);
        let total_available: Decimal = batches.iter().map(Batch::available).sum();

        let request = AllocationRequest {
            line_id: OrderLineId::new(),
            product_id,
            binding: BatchBinding::AutoAllocate,
            quantity,
        };

        match plan_reservations(&[request], &batches) {
            Ok(plans) => {
                let allocated: Decimal =
                    plans[0].allocations.iter().map(|a| a.quantity).sum();
                prop_assert_eq!(allocated, quantity);
                for allocation in &plans[0].allocations {
                    let batch = batches
                        .iter()
                        .find(|b| b.id == allocation.batch_id)
                        .expect("allocation references known batch");
                    prop_assert!(allocation.quantity <= batch.available());
                    prop_assert!(allocation.quantity > Decimal::ZERO);
                }
            }
            Err(_) => {
                prop_assert!(total_available < quantity);
            }
        }
    }

    /// Allocation is deterministic: the same inputs produce the same plan.
    #[test]
    fn prop_allocation_is_deterministic(
        counters in batch_counters_strategy(),
        quantity in quantity_strategy(),
    ) {
        let product_id = ProductId::new();
        let batches = make_batches(product_id, &counters);
        let request = AllocationRequest {
            line_id: OrderLineId::new(),
            product_id,
            binding: BatchBinding::AutoAllocate,
            quantity,
        };

        let first = plan_reservations(std::slice::from_ref(&request), &batches);
        let second = plan_reservations(&[request], &batches);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "allocation outcome differed between runs"),
        }
    }

    /// Every accepted movement preserves 0 <= reserved <= on_hand.
    #[test]
    fn prop_movements_preserve_counter_invariants(
        on_hand in 0i64..10_000i64,
        reserved_frac in 0i64..10_000i64,
        quantity in quantity_strategy(),
        kind_index in 0usize..4usize,
    ) {
        let reserved = reserved_frac.min(on_hand);
        let batch = Batch {
            id: BatchId::new(),
            product_id: ProductId::new(),
            label: "LOT".to_string(),
            on_hand: Decimal::new(on_hand, 2),
            reserved: Decimal::new(reserved, 2),
            received_at: Utc::now(),
        };
        let kind = [
            StockMovementKind::Reserve,
            StockMovementKind::Release,
            StockMovementKind::Issue,
            StockMovementKind::RefundReturn,
        ][kind_index];

        if let Ok((updated, movement)) = StockService::apply(&batch, kind, quantity) {
            prop_assert!(updated.on_hand >= Decimal::ZERO);
            prop_assert!(updated.reserved >= Decimal::ZERO);
            prop_assert!(updated.reserved <= updated.on_hand);
            prop_assert_eq!(updated.on_hand - batch.on_hand, movement.on_hand_delta);
            prop_assert_eq!(updated.reserved - batch.reserved, movement.reserved_delta);
        }
    }

    /// Reserve followed by release restores the original counters.
    #[test]
    fn prop_reserve_then_release_is_identity(
        on_hand in 1i64..10_000i64,
        quantity in quantity_strategy(),
    ) {
        let batch = Batch {
            id: BatchId::new(),
            product_id: ProductId::new(),
            label: "LOT".to_string(),
            on_hand: Decimal::new(on_hand, 2),
            reserved: Decimal::ZERO,
            received_at: Utc::now(),
        };

        if let Ok((reserved, _)) = StockService::apply(&batch, StockMovementKind::Reserve, quantity) {
            let (released, _) =
                StockService::apply(&reserved, StockMovementKind::Release, quantity)
                    .expect("release of an existing reservation succeeds");
            prop_assert_eq!(released.on_hand, batch.on_hand);
            prop_assert_eq!(released.reserved, batch.reserved);
        }
    }
}
