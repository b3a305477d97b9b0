//! Physical-count adjustment: reconciles a stock coordinate against a
//! counted quantity, posting an ADJUST_IN/ADJUST_OUT ledger entry for the
//! difference and a count-audit record for the count history either way.

use crate::db::DbPool;
use crate::entities::{
    count_audit,
    ledger_entry::{self, EntryStatus, TransactionType},
    lot,
    stock_level,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::sequence::{rule_types, SequenceService};
use crate::services::stock_state::{self, StockCoordinate};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CountStock {
    pub organization_id: i64,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub counted_qty: Decimal,
    pub reason: String,
    pub actor: String,
}

/// Service recording physical counts against the ledger.
#[derive(Clone)]
pub struct StockCountService {
    db: Arc<DbPool>,
    sequences: Arc<SequenceService>,
    event_sender: EventSender,
}

impl StockCountService {
    pub fn new(
        db: Arc<DbPool>,
        sequences: Arc<SequenceService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            sequences,
            event_sender,
        }
    }

    /// Sets a coordinate's quantity to the counted value. A zero difference
    /// produces no ledger entry but still writes the audit record and
    /// stamps `last_counted_at`.
    #[instrument(skip(self, cmd), fields(warehouse = %cmd.warehouse_code, part = %cmd.part_id))]
    pub async fn adjust(&self, cmd: CountStock) -> Result<count_audit::Model, ServiceError> {
        if cmd.counted_qty < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "counted quantity cannot be negative, got {}",
                cmd.counted_qty
            )));
        }

        let sequences = self.sequences.clone();
        let audit = self
            .db
            .transaction::<_, count_audit::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let coord = StockCoordinate::new(
                        cmd.organization_id,
                        cmd.warehouse_code.clone(),
                        cmd.part_id,
                        cmd.lot_id,
                    );
                    let row = stock_state::find(txn, &coord).await?;
                    let before_qty = row.as_ref().map(|r| r.qty).unwrap_or(Decimal::ZERO);
                    let diff = cmd.counted_qty - before_qty;

                    let ledger_entry_id = if diff.is_zero() {
                        None
                    } else {
                        let number = sequences
                            .next_number_in(txn, rule_types::TRANSACTION, &cmd.actor)
                            .await?;
                        let (transaction_type, from_warehouse, to_warehouse) =
                            if diff > Decimal::ZERO {
                                (TransactionType::AdjustIn, None, Some(cmd.warehouse_code.clone()))
                            } else {
                                (TransactionType::AdjustOut, Some(cmd.warehouse_code.clone()), None)
                            };

                        let entry = ledger_entry::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transaction_number: Set(number),
                            transaction_type: Set(transaction_type.as_str().to_string()),
                            transaction_date: Set(Utc::now()),
                            from_warehouse: Set(from_warehouse),
                            to_warehouse: Set(to_warehouse),
                            part_id: Set(cmd.part_id),
                            lot_id: Set(cmd.lot_id),
                            qty: Set(diff),
                            reference_type: Set(None),
                            reference_id: Set(None),
                            cancel_reference_id: Set(None),
                            status: Set(EntryStatus::Done.as_str().to_string()),
                            reason: Set(Some(cmd.reason.clone())),
                            notes: Set(None),
                            created_by: Set(cmd.actor.clone()),
                            organization_id: Set(cmd.organization_id),
                            created_at: Set(Utc::now()),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        stock_state::apply_delta(txn, &coord, diff, None).await?;

                        if let Some(lot_id) = cmd.lot_id {
                            let lot = lot::Entity::find_by_id(lot_id)
                                .lock_exclusive()
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!("Lot {} not found", lot_id))
                                })?;
                            stock_state::apply_lot_delta(txn, lot, diff, Decimal::ZERO).await?;
                        }

                        Some(entry.id)
                    };

                    stamp_last_counted(txn, &coord).await?;

                    let audit = count_audit::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        warehouse_code: Set(cmd.warehouse_code.clone()),
                        part_id: Set(cmd.part_id),
                        lot_id: Set(cmd.lot_id),
                        before_qty: Set(before_qty),
                        counted_qty: Set(cmd.counted_qty),
                        diff_qty: Set(diff),
                        reason: Set(cmd.reason.clone()),
                        ledger_entry_id: Set(ledger_entry_id),
                        counted_by: Set(cmd.actor.clone()),
                        organization_id: Set(cmd.organization_id),
                        counted_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(audit)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            warehouse = %audit.warehouse_code,
            before = %audit.before_qty,
            counted = %audit.counted_qty,
            diff = %audit.diff_qty,
            "stock counted"
        );
        self.event_sender
            .send_or_log(Event::StockCounted {
                audit_id: audit.id,
                warehouse: audit.warehouse_code.clone(),
                part_id: audit.part_id,
                lot_id: audit.lot_id,
                before_qty: audit.before_qty,
                counted_qty: audit.counted_qty,
            })
            .await;

        Ok(audit)
    }
}

/// Stamps `last_counted_at` on the coordinate's projection row, creating a
/// zero row when the coordinate was never stocked so the count history has
/// somewhere to hang.
async fn stamp_last_counted<C: sea_orm::ConnectionTrait>(
    conn: &C,
    coord: &StockCoordinate,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    // Re-read: the adjustment may have just created or changed the row.
    let row = stock_state::find(conn, coord).await?;
    match row {
        Some(row) => {
            let mut active: stock_level::ActiveModel = row.into();
            active.last_counted_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(conn).await.map_err(ServiceError::db_error)?;
        }
        None => {
            stock_level::ActiveModel {
                id: Set(Uuid::new_v4()),
                warehouse_code: Set(coord.warehouse_code.clone()),
                part_id: Set(coord.part_id),
                lot_id: Set(coord.lot_id),
                qty: Set(Decimal::ZERO),
                reserved_qty: Set(Decimal::ZERO),
                available_qty: Set(Decimal::ZERO),
                last_counted_at: Set(Some(now)),
                organization_id: Set(coord.organization_id),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;
        }
    }
    Ok(())
}
