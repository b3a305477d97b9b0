use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Types of stock movements recorded in the ledger.
///
/// Each movement type carries its own reversal counterpart (see
/// [`TransactionType::reversal`]) so a cancellation can never hit a missing
/// mapping at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Receive,
    Issue,
    Transfer,
    AdjustIn,
    AdjustOut,
    Scrap,
    LotSplit,
    LotMerge,
    ReceiveCancel,
    IssueCancel,
    TransferCancel,
    AdjustInCancel,
    AdjustOutCancel,
    ScrapCancel,
    LotSplitCancel,
    LotMergeCancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receive => "RECEIVE",
            TransactionType::Issue => "ISSUE",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::AdjustIn => "ADJUST_IN",
            TransactionType::AdjustOut => "ADJUST_OUT",
            TransactionType::Scrap => "SCRAP",
            TransactionType::LotSplit => "LOT_SPLIT",
            TransactionType::LotMerge => "LOT_MERGE",
            TransactionType::ReceiveCancel => "RECEIVE_CANCEL",
            TransactionType::IssueCancel => "ISSUE_CANCEL",
            TransactionType::TransferCancel => "TRANSFER_CANCEL",
            TransactionType::AdjustInCancel => "ADJUST_IN_CANCEL",
            TransactionType::AdjustOutCancel => "ADJUST_OUT_CANCEL",
            TransactionType::ScrapCancel => "SCRAP_CANCEL",
            TransactionType::LotSplitCancel => "LOT_SPLIT_CANCEL",
            TransactionType::LotMergeCancel => "LOT_MERGE_CANCEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RECEIVE" => Some(TransactionType::Receive),
            "ISSUE" => Some(TransactionType::Issue),
            "TRANSFER" => Some(TransactionType::Transfer),
            "ADJUST_IN" => Some(TransactionType::AdjustIn),
            "ADJUST_OUT" => Some(TransactionType::AdjustOut),
            "SCRAP" => Some(TransactionType::Scrap),
            "LOT_SPLIT" => Some(TransactionType::LotSplit),
            "LOT_MERGE" => Some(TransactionType::LotMerge),
            "RECEIVE_CANCEL" => Some(TransactionType::ReceiveCancel),
            "ISSUE_CANCEL" => Some(TransactionType::IssueCancel),
            "TRANSFER_CANCEL" => Some(TransactionType::TransferCancel),
            "ADJUST_IN_CANCEL" => Some(TransactionType::AdjustInCancel),
            "ADJUST_OUT_CANCEL" => Some(TransactionType::AdjustOutCancel),
            "SCRAP_CANCEL" => Some(TransactionType::ScrapCancel),
            "LOT_SPLIT_CANCEL" => Some(TransactionType::LotSplitCancel),
            "LOT_MERGE_CANCEL" => Some(TransactionType::LotMergeCancel),
            _ => None,
        }
    }

    /// The transaction type posted when an entry of this type is reversed.
    ///
    /// Reversal entries themselves return `None`: a cancellation cannot be
    /// cancelled, it has to be re-posted as a fresh movement. Lot split and
    /// merge also return `None` because they are undone by the inverse lot
    /// operation, not by the generic cancel path.
    pub fn reversal(&self) -> Option<TransactionType> {
        match self {
            TransactionType::Receive => Some(TransactionType::ReceiveCancel),
            TransactionType::Issue => Some(TransactionType::IssueCancel),
            TransactionType::Transfer => Some(TransactionType::TransferCancel),
            TransactionType::AdjustIn => Some(TransactionType::AdjustInCancel),
            TransactionType::AdjustOut => Some(TransactionType::AdjustOutCancel),
            TransactionType::Scrap => Some(TransactionType::ScrapCancel),
            TransactionType::LotSplit
            | TransactionType::LotMerge
            | TransactionType::ReceiveCancel
            | TransactionType::IssueCancel
            | TransactionType::TransferCancel
            | TransactionType::AdjustInCancel
            | TransactionType::AdjustOutCancel
            | TransactionType::ScrapCancel
            | TransactionType::LotSplitCancel
            | TransactionType::LotMergeCancel => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Done,
    Canceled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Done => "DONE",
            EntryStatus::Canceled => "CANCELED",
        }
    }
}

/// One immutable stock movement.
///
/// Sign convention: an entry decrements `qty.abs()` at `from_warehouse`
/// (when set) and increments `qty.abs()` at `to_warehouse` (when set).
/// `qty` itself carries the net effect, so receipts are positive, issues
/// negative, and a transfer is one entry with both ends populated and a
/// positive magnitude. Rows are never updated after insert except the
/// DONE -> CANCELED status flip on the original when a reversal posts; the
/// reversal entry is born CANCELED so the pair drops out of DONE sums
/// together.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_number: String,
    pub transaction_type: String,
    pub transaction_date: DateTime<Utc>,
    pub from_warehouse: Option<String>,
    pub to_warehouse: Option<String>,
    pub part_id: Uuid,
    pub lot_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub cancel_reference_id: Option<Uuid>,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

impl Model {
    pub fn transaction_type(&self) -> Option<TransactionType> {
        TransactionType::from_str(&self.transaction_type)
    }

    pub fn is_done(&self) -> bool {
        self.status == EntryStatus::Done.as_str()
    }

    /// The magnitude moved by this entry, regardless of direction.
    pub fn moved_qty(&self) -> Decimal {
        self.qty.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_strings_round_trip() {
        let all = [
            TransactionType::Receive,
            TransactionType::Issue,
            TransactionType::Transfer,
            TransactionType::AdjustIn,
            TransactionType::AdjustOut,
            TransactionType::Scrap,
            TransactionType::LotSplit,
            TransactionType::LotMerge,
            TransactionType::ReceiveCancel,
            TransactionType::IssueCancel,
            TransactionType::TransferCancel,
            TransactionType::AdjustInCancel,
            TransactionType::AdjustOutCancel,
            TransactionType::ScrapCancel,
            TransactionType::LotSplitCancel,
            TransactionType::LotMergeCancel,
        ];
        for t in all {
            assert_eq!(TransactionType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn every_movement_type_has_a_reversal() {
        assert_eq!(
            TransactionType::Receive.reversal(),
            Some(TransactionType::ReceiveCancel)
        );
        assert_eq!(
            TransactionType::Transfer.reversal(),
            Some(TransactionType::TransferCancel)
        );
        assert_eq!(
            TransactionType::AdjustOut.reversal(),
            Some(TransactionType::AdjustOutCancel)
        );
    }

    #[test]
    fn reversals_are_terminal() {
        assert_eq!(TransactionType::ReceiveCancel.reversal(), None);
        assert_eq!(TransactionType::IssueCancel.reversal(), None);
        assert_eq!(TransactionType::LotSplit.reversal(), None);
        assert_eq!(TransactionType::LotMerge.reversal(), None);
    }
}
