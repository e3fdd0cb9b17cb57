//! Conversions from persisted models to core domain types.

use chrono::Utc;
use tally_core::order::{Order, OrderLine, OrderTotals, PaymentEntry};
use tally_core::stock::{Batch, BatchBinding};
use tally_shared::types::{
    BatchId, CounterpartyId, OrderId, OrderLineId, PaymentEntryId, ProductId, UserId,
};

use crate::entities::{batches, order_lines, orders, payment_entries, sea_orm_active_enums};

pub(crate) fn to_core_order(model: &orders::Model) -> Order {
    Order {
        id: OrderId::from_uuid(model.id),
        kind: model.kind.clone().into(),
        counterparty_id: CounterpartyId::from_uuid(model.counterparty_id),
        status: model.status.clone().into(),
        totals: OrderTotals {
            subtotal: model.subtotal,
            vat: model.vat_total,
            manufacturing_tax: model.manufacturing_tax_total,
            total: model.total,
        },
        due_date: model.due_date,
        created_by: UserId::from_uuid(model.created_by),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_core_entry(model: &payment_entries::Model) -> PaymentEntry {
    PaymentEntry {
        id: PaymentEntryId::from_uuid(model.id),
        order_id: OrderId::from_uuid(model.order_id),
        entry_type: model.entry_type.clone().into(),
        amount: model.amount,
        method: model.method.clone().into(),
        reference: model.reference.clone(),
        check_number: model.check_number.clone(),
        recorded_by: UserId::from_uuid(model.recorded_by),
        recorded_at: model.recorded_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_core_line(model: &order_lines::Model) -> OrderLine {
    let binding = match (&model.binding_mode, model.bound_batch_id) {
        (sea_orm_active_enums::BindingMode::ExplicitBatch, Some(batch_id)) => {
            BatchBinding::ExplicitBatch(BatchId::from_uuid(batch_id))
        }
        _ => BatchBinding::AutoAllocate,
    };

    OrderLine {
        id: OrderLineId::from_uuid(model.id),
        order_id: OrderId::from_uuid(model.order_id),
        product_id: ProductId::from_uuid(model.product_id),
        binding,
        quantity: model.quantity,
        unit_price: model.unit_price,
        vat_amount: model.vat_amount,
        manufacturing_tax_amount: model.manufacturing_tax_amount,
        refunded_quantity: model.refunded_quantity,
    }
}

pub(crate) fn to_core_batch(model: &batches::Model) -> Batch {
    Batch {
        id: BatchId::from_uuid(model.id),
        product_id: ProductId::from_uuid(model.product_id),
        label: model.label.clone(),
        on_hand: model.on_hand,
        reserved: model.reserved,
        received_at: model.received_at.with_timezone(&Utc),
    }
}
