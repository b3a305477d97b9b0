use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Materialized current quantity at a (warehouse, part, lot-or-none)
/// coordinate. Derived from the ledger; only ever mutated inside a ledger
/// operation's transaction. Rows are created lazily on first receipt and
/// kept as zero rows rather than deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub lot_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub reserved_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub available_qty: Decimal,
    pub last_counted_at: Option<DateTime<Utc>>,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lot::Entity",
        from = "Column::LotId",
        to = "super::lot::Column::Id"
    )]
    Lot,
}

impl Related<super::lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
