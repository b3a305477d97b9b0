use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration row for one named document-number counter.
///
/// Mutated exclusively by the sequence service under an exclusive row lock;
/// the lock is what serializes concurrent callers instead of a
/// read-then-write race.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rule_type: String,
    pub pattern: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub sequence_length: i32,
    pub current_sequence: i64,
    pub reset_policy: String,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetPolicy {
    None,
    Daily,
    Monthly,
    Yearly,
}

impl ResetPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetPolicy::None => "NONE",
            ResetPolicy::Daily => "DAILY",
            ResetPolicy::Monthly => "MONTHLY",
            ResetPolicy::Yearly => "YEARLY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(ResetPolicy::None),
            "DAILY" => Some(ResetPolicy::Daily),
            "MONTHLY" => Some(ResetPolicy::Monthly),
            "YEARLY" => Some(ResetPolicy::Yearly),
            _ => None,
        }
    }
}
