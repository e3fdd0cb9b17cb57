//! Deterministic batch allocation for order lines.
//!
//! Explicitly bound lines draw from their batch alone. Auto-allocated lines
//! draw from the product's batches in earliest-received-first order (ties
//! broken by batch id), splitting across batches when one cannot cover the
//! line. The same inputs always produce the same plan.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tally_shared::types::{BatchId, OrderLineId, ProductId};

use super::error::StockError;
use super::types::{Batch, BatchAllocation, BatchBinding};

/// One line's allocation request.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// The order line being allocated.
    pub line_id: OrderLineId,
    /// The product the line orders.
    pub product_id: ProductId,
    /// How the line selects batches.
    pub binding: BatchBinding,
    /// The quantity to reserve.
    pub quantity: Decimal,
}

/// The allocations planned for one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAllocation {
    /// The order line.
    pub line_id: OrderLineId,
    /// The batches the line draws from, in draw order.
    pub allocations: Vec<BatchAllocation>,
}

/// Plans reservations for a whole order against a batch snapshot.
///
/// Earlier lines consume availability seen by later lines, so two lines of
/// the same product never double-book the same units.
///
/// # Errors
///
/// Returns `BatchNotFound` / `BatchProductMismatch` for broken explicit
/// bindings and `InsufficientStock` when availability cannot cover a line.
pub fn plan_reservations(
    requests: &[AllocationRequest],
    batches: &[Batch],
) -> Result<Vec<LineAllocation>, StockError> {
    // Working availability, consumed as lines are planned.
    let mut available: HashMap<BatchId, Decimal> =
        batches.iter().map(|b| (b.id, b.available())).collect();

    let mut plans = Vec::with_capacity(requests.len());
    for request in requests {
        if request.quantity == Decimal::ZERO {
            return Err(StockError::ZeroQuantity);
        }
        if request.quantity < Decimal::ZERO {
            return Err(StockError::NegativeQuantity);
        }

        let allocations = match request.binding {
            BatchBinding::ExplicitBatch(batch_id) => {
                allocate_explicit(request, batch_id, batches, &mut available)?
            }
            BatchBinding::AutoAllocate => allocate_auto(request, batches, &mut available)?,
        };

        plans.push(LineAllocation {
            line_id: request.line_id,
            allocations,
        });
    }

    Ok(plans)
}

/// Draws the full quantity from one explicitly bound batch.
fn allocate_explicit(
    request: &AllocationRequest,
    batch_id: BatchId,
    batches: &[Batch],
    available: &mut HashMap<BatchId, Decimal>,
) -> Result<Vec<BatchAllocation>, StockError> {
    let batch = batches
        .iter()
        .find(|b| b.id == batch_id)
        .ok_or(StockError::BatchNotFound(batch_id))?;

    if batch.product_id != request.product_id {
        return Err(StockError::BatchProductMismatch {
            batch_id,
            product_id: request.product_id,
        });
    }

    let remaining = available.get(&batch_id).copied().unwrap_or(Decimal::ZERO);
    if remaining < request.quantity {
        return Err(StockError::InsufficientStock {
            product_id: request.product_id,
            requested: request.quantity,
            available: remaining,
        });
    }

    available.insert(batch_id, remaining - request.quantity);
    Ok(vec![BatchAllocation {
        batch_id,
        quantity: request.quantity,
    }])
}

/// Splits the quantity across eligible batches, earliest received first.
fn allocate_auto(
    request: &AllocationRequest,
    batches: &[Batch],
    available: &mut HashMap<BatchId, Decimal>,
) -> Result<Vec<BatchAllocation>, StockError> {
    let mut eligible: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.product_id == request.product_id)
        .collect();
    eligible.sort_by(|a, b| {
        a.received_at
            .cmp(&b.received_at)
            .then(a.id.into_inner().cmp(&b.id.into_inner()))
    });

    let total_available: Decimal = eligible
        .iter()
        .map(|b| available.get(&b.id).copied().unwrap_or(Decimal::ZERO))
        .sum();
    if total_available < request.quantity {
        return Err(StockError::InsufficientStock {
            product_id: request.product_id,
            requested: request.quantity,
            available: total_available,
        });
    }

    let mut allocations = Vec::new();
    let mut remaining = request.quantity;
    for batch in eligible {
        if remaining == Decimal::ZERO {
            break;
        }
        let batch_available = available.get(&batch.id).copied().unwrap_or(Decimal::ZERO);
        if batch_available == Decimal::ZERO {
            continue;
        }
        let take = batch_available.min(remaining);
        available.insert(batch.id, batch_available - take);
        allocations.push(BatchAllocation {
            batch_id: batch.id,
            quantity: take,
        });
        remaining -= take;
    }

    Ok(allocations)
}
