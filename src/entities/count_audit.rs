use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Physical-count history record, distinct from the ledger entry a count
/// may produce. Written on every count, including zero-diff counts (which
/// create no ledger entry, so `ledger_entry_id` is NULL for them).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "count_audits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub lot_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub before_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub counted_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub diff_qty: Decimal,
    pub reason: String,
    pub ledger_entry_id: Option<Uuid>,
    pub counted_by: String,
    pub organization_id: i64,
    pub counted_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
