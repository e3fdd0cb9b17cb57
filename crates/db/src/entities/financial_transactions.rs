//! `SeaORM` Entity for the financial_transactions table.
//!
//! The reporting mirror of the payment ledger. Written in the same unit
//! of work as the mirrored entry; consumed only by reporting.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::FinancialKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_entry_id: Uuid,
    pub counterparty_id: Uuid,
    pub kind: FinancialKind,
    /// Signed: positive for payments, negative for refunds.
    pub amount: Decimal,
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
    #[sea_orm(
        belongs_to = "super::payment_entries::Entity",
        from = "Column::PaymentEntryId",
        to = "super::payment_entries::Column::Id"
    )]
    PaymentEntries,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::payment_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
