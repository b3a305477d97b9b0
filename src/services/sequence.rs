//! Document-number generation.
//!
//! Each named rule is a single row updated under an exclusive row lock, so
//! correctness holds across concurrent requests and multiple server
//! instances; there is deliberately no in-memory counter.

use crate::db::DbPool;
use crate::entities::sequence_rule::{self, ResetPolicy};
use crate::errors::ServiceError;
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Well-known rule types the ledger core itself consumes. Callers may
/// provision and use additional rules freely.
pub mod rule_types {
    pub const TRANSACTION: &str = "TRANSACTION_NUMBER";
    pub const LOT: &str = "LOT_NUMBER";
}

/// Mints formatted document numbers (transaction numbers, lot numbers) from
/// pre-provisioned sequence rules.
#[derive(Clone)]
pub struct SequenceService {
    db: Arc<DbPool>,
}

impl SequenceService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Independent mode: opens and commits its own unit of work. A caller
    /// failure after this returns does not un-consume the number, so gaps
    /// are possible; in exchange the row lock is held only briefly.
    #[instrument(skip(self))]
    pub async fn next_number(&self, rule_type: &str, actor: &str) -> Result<String, ServiceError> {
        let rule_type = rule_type.to_string();
        let actor = actor.to_string();
        self.db
            .transaction::<_, String, ServiceError>(move |txn| {
                Box::pin(async move { advance(txn, &rule_type, &actor, Utc::now()).await })
            })
            .await
            .map_err(ServiceError::from)
    }

    /// Joined mode: participates in the caller's already-open unit of work.
    /// A caller rollback also rolls back the increment (gap-free numbers),
    /// at the cost of holding the rule's row lock until the caller commits.
    pub async fn next_number_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        rule_type: &str,
        actor: &str,
    ) -> Result<String, ServiceError> {
        advance(conn, rule_type, actor, Utc::now()).await
    }
}

/// Locks the rule row, applies the reset policy, persists the incremented
/// counter, and renders the formatted number.
async fn advance<C: ConnectionTrait>(
    conn: &C,
    rule_type: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let rule = sequence_rule::Entity::find()
        .filter(sequence_rule::Column::RuleType.eq(rule_type))
        .filter(sequence_rule::Column::Active.eq(true))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::RuleNotFound(rule_type.to_string()))?;

    let policy = ResetPolicy::from_str(&rule.reset_policy).ok_or_else(|| {
        ServiceError::InternalError(format!(
            "sequence rule '{}' has unknown reset policy '{}'",
            rule_type, rule.reset_policy
        ))
    })?;

    let next_seq = if reset_boundary_crossed(policy, rule.last_reset_at, now) {
        1
    } else {
        rule.current_sequence + 1
    };

    let formatted = format_number(
        &rule.pattern,
        rule.prefix.as_deref(),
        rule.suffix.as_deref(),
        rule.sequence_length as usize,
        next_seq,
        now,
    );

    let mut active: sequence_rule::ActiveModel = rule.into();
    active.current_sequence = Set(next_seq);
    active.last_reset_at = Set(Some(now));
    active.updated_by = Set(Some(actor.to_string()));
    active.updated_at = Set(now);
    active.update(conn).await.map_err(ServiceError::db_error)?;

    debug!(rule_type, sequence = next_seq, number = %formatted, "sequence advanced");
    Ok(formatted)
}

/// Whether `now` falls in a later reset period than the last recorded use.
/// A rule that has never been used starts a fresh period for every policy
/// except NONE.
fn reset_boundary_crossed(
    policy: ResetPolicy,
    last_reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let last = match last_reset_at {
        Some(last) => last,
        None => return policy != ResetPolicy::None,
    };
    match policy {
        ResetPolicy::None => false,
        ResetPolicy::Daily => last.date_naive() != now.date_naive(),
        ResetPolicy::Monthly => (last.year(), last.month()) != (now.year(), now.month()),
        ResetPolicy::Yearly => last.year() != now.year(),
    }
}

/// Substitutes the date, sequence, and affix placeholders in a rule pattern.
/// Patterns that carry no `{PREFIX}`/`{SUFFIX}` placeholders get the affixes
/// concatenated around the rendered body instead.
fn format_number(
    pattern: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
    sequence_length: usize,
    sequence: i64,
    now: DateTime<Utc>,
) -> String {
    let seq = format!("{:0width$}", sequence, width = sequence_length);
    let has_prefix_slot = pattern.contains("{PREFIX}");
    let has_suffix_slot = pattern.contains("{SUFFIX}");

    let mut rendered = pattern
        .replace("{YYYY}", &format!("{:04}", now.year()))
        .replace("{YY}", &format!("{:02}", now.year() % 100))
        .replace("{MM}", &format!("{:02}", now.month()))
        .replace("{DD}", &format!("{:02}", now.day()))
        .replace("{SEQ}", &seq)
        .replace("{PREFIX}", prefix.unwrap_or(""))
        .replace("{SUFFIX}", suffix.unwrap_or(""));

    if !has_prefix_slot {
        if let Some(prefix) = prefix {
            rendered = format!("{prefix}{rendered}");
        }
    }
    if !has_suffix_slot {
        if let Some(suffix) = suffix {
            rendered = format!("{rendered}{suffix}");
        }
    }
    rendered
}
