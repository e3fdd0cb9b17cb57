//! `SeaORM` Entity for the refund_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "refund_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub refund_transaction_id: Uuid,
    pub order_line_id: Uuid,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::refund_transactions::Entity",
        from = "Column::RefundTransactionId",
        to = "super::refund_transactions::Column::Id"
    )]
    RefundTransactions,
    #[sea_orm(
        belongs_to = "super::order_lines::Entity",
        from = "Column::OrderLineId",
        to = "super::order_lines::Column::Id"
    )]
    OrderLines,
}

impl Related<super::refund_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefundTransactions.def()
    }
}

impl Related<super::order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
