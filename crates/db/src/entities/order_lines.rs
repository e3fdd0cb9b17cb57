//! `SeaORM` Entity for the order_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BindingMode;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub binding_mode: BindingMode,
    /// The bound batch when `binding_mode` is explicit.
    pub bound_batch_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_amount: Decimal,
    pub manufacturing_tax_amount: Decimal,
    pub refunded_quantity: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Orders,
    #[sea_orm(has_many = "super::order_line_allocations::Entity")]
    OrderLineAllocations,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::order_line_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLineAllocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
