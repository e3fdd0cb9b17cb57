//! `SeaORM` Entity for the batches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub label: String,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub received_at: DateTimeWithTimeZone,
    /// Optimistic locking counter, bumped on every counter mutation.
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_transactions::Entity")]
    InventoryTransactions,
    #[sea_orm(has_many = "super::order_line_allocations::Entity")]
    OrderLineAllocations,
}

impl Related<super::inventory_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::order_line_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLineAllocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
