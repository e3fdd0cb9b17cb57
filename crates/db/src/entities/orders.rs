//! `SeaORM` Entity for the orders table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{OrderKind, OrderStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: OrderKind,
    pub counterparty_id: Uuid,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub manufacturing_tax_total: Decimal,
    pub total: Decimal,
    pub due_date: Date,
    /// Optimistic locking counter, bumped on every mutation.
    pub version: i64,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_lines::Entity")]
    OrderLines,
    #[sea_orm(has_many = "super::payment_entries::Entity")]
    PaymentEntries,
    #[sea_orm(has_many = "super::refund_transactions::Entity")]
    RefundTransactions,
}

impl Related<super::order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl Related<super::payment_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentEntries.def()
    }
}

impl Related<super::refund_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefundTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
