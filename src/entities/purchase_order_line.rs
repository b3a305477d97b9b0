use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upstream purchase-order line. Owned by the procurement layer; the ledger
/// core adjusts `received_qty` and `status` as a side effect of receiving
/// against the line and of cancelling such receipts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub po_number: String,
    pub line_no: i32,
    pub part_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub ordered_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub received_qty: Decimal,
    pub status: String,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoLineStatus {
    Open,
    Partial,
    Received,
}

impl PoLineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoLineStatus::Open => "OPEN",
            PoLineStatus::Partial => "PARTIAL",
            PoLineStatus::Received => "RECEIVED",
        }
    }

    /// Status derived from the received-versus-ordered position.
    pub fn for_quantities(received: Decimal, ordered: Decimal) -> Self {
        if received.is_zero() {
            PoLineStatus::Open
        } else if received < ordered {
            PoLineStatus::Partial
        } else {
            PoLineStatus::Received
        }
    }
}
