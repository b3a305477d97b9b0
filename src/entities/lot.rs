use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A traceable batch of one part.
///
/// Invariants maintained by the ledger services:
/// `0 <= current_qty <= initial_qty`, and `status == DEPLETED` exactly when
/// `current_qty == 0`. HOLD blocks every stock-reducing operation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lot_number: String,
    pub part_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub initial_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub current_qty: Decimal,
    pub status: String,
    pub inspection_status: String,
    pub vendor: Option<String>,
    pub supplier_lot_number: Option<String>,
    pub origin_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Part,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotStatus {
    Normal,
    Hold,
    Depleted,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Normal => "NORMAL",
            LotStatus::Hold => "HOLD",
            LotStatus::Depleted => "DEPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(LotStatus::Normal),
            "HOLD" => Some(LotStatus::Hold),
            "DEPLETED" => Some(LotStatus::Depleted),
            _ => None,
        }
    }

    /// Status implied by a quantity: zero is DEPLETED, anything else NORMAL.
    pub fn for_quantity(qty: Decimal) -> Self {
        if qty.is_zero() {
            LotStatus::Depleted
        } else {
            LotStatus::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectionStatus {
    Pending,
    Pass,
    Fail,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::Pending => "PENDING",
            InspectionStatus::Pass => "PASS",
            InspectionStatus::Fail => "FAIL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(InspectionStatus::Pending),
            "PASS" => Some(InspectionStatus::Pass),
            "FAIL" => Some(InspectionStatus::Fail),
            _ => None,
        }
    }
}

impl Model {
    pub fn lot_status(&self) -> Option<LotStatus> {
        LotStatus::from_str(&self.status)
    }

    pub fn is_on_hold(&self) -> bool {
        self.status == LotStatus::Hold.as_str()
    }

    pub fn is_depleted(&self) -> bool {
        self.status == LotStatus::Depleted.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_round_trips() {
        for status in [LotStatus::Normal, LotStatus::Hold, LotStatus::Depleted] {
            assert_eq!(LotStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LotStatus::from_str("SCRAPPED"), None);
    }

    #[test]
    fn quantity_implies_status() {
        assert_eq!(LotStatus::for_quantity(dec!(0)), LotStatus::Depleted);
        assert_eq!(LotStatus::for_quantity(dec!(0.0001)), LotStatus::Normal);
    }
}
