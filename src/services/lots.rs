//! Lot restructuring: split one lot into two, merge several lots into one,
//! and the hold/release and inspection-status transitions. Split and merge
//! conserve quantity exactly and post a single ledger entry each; they are
//! undone by the inverse operation rather than the generic cancel path.

use crate::db::DbPool;
use crate::entities::{
    ledger_entry::{self, EntryStatus, TransactionType},
    lot::{self, InspectionStatus, LotStatus},
    part,
    stock_level,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::sequence::{rule_types, SequenceService};
use crate::services::stock_state::{self, StockCoordinate};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Reference type set on LOT_SPLIT entries, pointing at the source lot.
pub const LOT_REFERENCE: &str = "LOT";

#[derive(Debug, Clone)]
pub struct SplitLot {
    pub organization_id: i64,
    pub source_lot_id: Uuid,
    pub qty: Decimal,
    pub new_lot_number: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct MergeLots {
    pub organization_id: i64,
    /// At least two lots; the target defaults to the first when not named.
    pub lot_ids: Vec<Uuid>,
    pub target_lot_id: Option<Uuid>,
    pub actor: String,
}

/// Service for lot lifecycle operations beyond plain stock movements.
#[derive(Clone)]
pub struct LotService {
    db: Arc<DbPool>,
    sequences: Arc<SequenceService>,
    event_sender: EventSender,
}

impl LotService {
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

    /// Splits `qty` out of a lot into a new lot carrying the same
    /// traceability fields, mirroring the move across the projection rows
    /// at the source coordinate. Conservation: source_after + new ==
    /// source_before.
    #[instrument(skip(self, cmd), fields(source = %cmd.source_lot_id, qty = %cmd.qty))]
    pub async fn split(&self, cmd: SplitLot) -> Result<lot::Model, ServiceError> {
        if cmd.qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "split quantity must be positive, got {}",
                cmd.qty
            )));
        }

        let sequences = self.sequences.clone();
        let (new_lot, source_lot_id, qty) = self
            .db
            .transaction::<_, (lot::Model, Uuid, Decimal), ServiceError>(move |txn| {
                Box::pin(async move {
                    let source = lot::Entity::find_by_id(cmd.source_lot_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Lot {} not found", cmd.source_lot_id))
                        })?;

                    if source.is_on_hold() || source.is_depleted() {
                        return Err(ServiceError::InvalidState(format!(
                            "lot {} is {} and cannot be split",
                            source.lot_number, source.status
                        )));
                    }
                    if cmd.qty >= source.current_qty {
                        return Err(ServiceError::InsufficientQuantity {
                            lot_number: source.lot_number.clone(),
                            available: source.current_qty,
                            requested: cmd.qty,
                        });
                    }

                    let part = part::Entity::find_by_id(source.part_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Part {} not found", source.part_id))
                        })?;
                    if !part.splittable {
                        return Err(ServiceError::InvalidState(format!(
                            "part {} is not splittable",
                            part.part_number
                        )));
                    }

                    let new_lot_number = match &cmd.new_lot_number {
                        Some(number) => {
                            let clash = lot::Entity::find()
                                .filter(lot::Column::OrganizationId.eq(cmd.organization_id))
                                .filter(lot::Column::LotNumber.eq(number.clone()))
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            if clash.is_some() {
                                return Err(ServiceError::ValidationError(format!(
                                    "lot number {} already exists",
                                    number
                                )));
                            }
                            number.clone()
                        }
                        None => {
                            sequences
                                .next_number_in(txn, rule_types::LOT, &cmd.actor)
                                .await?
                        }
                    };

                    let source_row = single_stocked_row(txn, &source).await?;
                    let warehouse = source_row.warehouse_code.clone();

                    let source_number = source.lot_number.clone();
                    let source_id = source.id;
                    // Traceability travels with the material.
                    let inspection_status = source.inspection_status.clone();
                    let vendor = source.vendor.clone();
                    let supplier_lot_number = source.supplier_lot_number.clone();
                    let origin_date = source.origin_date;
                    let expiry_date = source.expiry_date;
                    stock_state::apply_lot_delta(txn, source, -cmd.qty, Decimal::ZERO).await?;

                    let now = Utc::now();
                    let new_lot = lot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        lot_number: Set(new_lot_number),
                        part_id: Set(part.id),
                        initial_qty: Set(cmd.qty),
                        current_qty: Set(cmd.qty),
                        status: Set(LotStatus::Normal.as_str().to_string()),
                        inspection_status: Set(inspection_status),
                        vendor: Set(vendor),
                        supplier_lot_number: Set(supplier_lot_number),
                        origin_date: Set(origin_date),
                        expiry_date: Set(expiry_date),
                        organization_id: Set(cmd.organization_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let new_lot = new_lot.insert(txn).await.map_err(ServiceError::db_error)?;

                    let source_coord = StockCoordinate::new(
                        cmd.organization_id,
                        warehouse.clone(),
                        part.id,
                        Some(source_id),
                    );
                    let new_coord = StockCoordinate::new(
                        cmd.organization_id,
                        warehouse.clone(),
                        part.id,
                        Some(new_lot.id),
                    );
                    stock_state::apply_delta(txn, &source_coord, -cmd.qty, Some(&source_number))
                        .await?;
                    stock_state::apply_delta(txn, &new_coord, cmd.qty, None).await?;

                    let number = sequences
                        .next_number_in(txn, rule_types::TRANSACTION, &cmd.actor)
                        .await?;
                    ledger_entry::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transaction_number: Set(number),
                        transaction_type: Set(TransactionType::LotSplit.as_str().to_string()),
                        transaction_date: Set(now),
                        from_warehouse: Set(Some(warehouse.clone())),
                        to_warehouse: Set(Some(warehouse)),
                        part_id: Set(part.id),
                        lot_id: Set(Some(new_lot.id)),
                        qty: Set(cmd.qty),
                        reference_type: Set(Some(LOT_REFERENCE.to_string())),
                        reference_id: Set(Some(source_id)),
                        cancel_reference_id: Set(None),
                        status: Set(EntryStatus::Done.as_str().to_string()),
                        reason: Set(None),
                        notes: Set(Some(format!(
                            "split {} from lot {} into lot {}",
                            cmd.qty, source_number, new_lot.lot_number
                        ))),
                        created_by: Set(cmd.actor.clone()),
                        organization_id: Set(cmd.organization_id),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok((new_lot, source_id, cmd.qty))
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(source = %source_lot_id, new_lot = %new_lot.id, qty = %qty, "lot split");
        self.event_sender
            .send_or_log(Event::LotSplit {
                source_lot_id,
                new_lot_id: new_lot.id,
                qty,
            })
            .await;

        Ok(new_lot)
    }

    /// Merges two or more lots of the same part into one. The sources fold
    /// into the target's current AND initial quantity (keeping the
    /// received-so-far audit trail additive) and end up DEPLETED; the
    /// projection rows consolidate onto the target's coordinate.
    #[instrument(skip(self, cmd))]
    pub async fn merge(&self, cmd: MergeLots) -> Result<lot::Model, ServiceError> {
        if cmd.lot_ids.len() < 2 {
            return Err(ServiceError::ValidationError(
                "merge requires at least two lots".to_string(),
            ));
        }

        let sequences = self.sequences.clone();
        let (target, consumed_ids, total) = self
            .db
            .transaction::<_, (lot::Model, Vec<Uuid>, Decimal), ServiceError>(move |txn| {
                Box::pin(async move {
                    let target_id = cmd.target_lot_id.unwrap_or(cmd.lot_ids[0]);

                    let mut lots = Vec::with_capacity(cmd.lot_ids.len());
                    for lot_id in &cmd.lot_ids {
                        let lot = lot::Entity::find_by_id(*lot_id)
                            .lock_exclusive()
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Lot {} not found", lot_id))
                            })?;
                        lots.push(lot);
                    }
                    let target = match cmd.target_lot_id {
                        Some(id) if !cmd.lot_ids.contains(&id) => lot::Entity::find_by_id(id)
                            .lock_exclusive()
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Lot {} not found", id))
                            })?,
                        _ => lots
                            .iter()
                            .find(|l| l.id == target_id)
                            .cloned()
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Lot {} not found", target_id))
                            })?,
                    };

                    let part_id = target.part_id;
                    for lot in lots.iter().chain(std::iter::once(&target)) {
                        if lot.part_id != part_id {
                            return Err(ServiceError::PartMismatch(format!(
                                "lot {} belongs to part {}, expected {}",
                                lot.lot_number, lot.part_id, part_id
                            )));
                        }
                        if lot.is_on_hold() {
                            return Err(ServiceError::InvalidState(format!(
                                "lot {} is on hold and cannot be merged",
                                lot.lot_number
                            )));
                        }
                        if lot.is_depleted() || lot.current_qty.is_zero() {
                            return Err(ServiceError::InvalidState(format!(
                                "lot {} is depleted and cannot be merged",
                                lot.lot_number
                            )));
                        }
                    }

                    let target_row = single_stocked_row(txn, &target).await?;
                    let warehouse = target_row.warehouse_code.clone();

                    let sources: Vec<lot::Model> =
                        lots.into_iter().filter(|l| l.id != target.id).collect();
                    if sources.is_empty() {
                        return Err(ServiceError::ValidationError(
                            "merge requires at least one source lot besides the target"
                                .to_string(),
                        ));
                    }

                    let mut total = Decimal::ZERO;
                    let mut consumed_numbers = Vec::with_capacity(sources.len());
                    let mut consumed_ids = Vec::with_capacity(sources.len());
                    for source in sources {
                        let row = single_stocked_row(txn, &source).await?;
                        if row.warehouse_code != warehouse {
                            return Err(ServiceError::InvalidState(format!(
                                "lot {} is stocked at {} but the target sits at {}",
                                source.lot_number, row.warehouse_code, warehouse
                            )));
                        }

                        let source_coord = StockCoordinate::new(
                            cmd.organization_id,
                            warehouse.clone(),
                            part_id,
                            Some(source.id),
                        );
                        let source_qty = source.current_qty;
                        let source_number = source.lot_number.clone();
                        let source_id = source.id;

                        stock_state::apply_delta(
                            txn,
                            &source_coord,
                            -source_qty,
                            Some(&source_number),
                        )
                        .await?;
                        stock_state::apply_lot_delta(txn, source, -source_qty, Decimal::ZERO)
                            .await?;

                        total += source_qty;
                        consumed_numbers.push(source_number);
                        consumed_ids.push(source_id);
                    }

                    let target_coord = StockCoordinate::new(
                        cmd.organization_id,
                        warehouse.clone(),
                        part_id,
                        Some(target.id),
                    );
                    stock_state::apply_delta(txn, &target_coord, total, None).await?;
                    let target_id = target.id;
                    let target = stock_state::apply_lot_delta(txn, target, total, total).await?;

                    let number = sequences
                        .next_number_in(txn, rule_types::TRANSACTION, &cmd.actor)
                        .await?;
                    let now = Utc::now();
                    ledger_entry::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transaction_number: Set(number),
                        transaction_type: Set(TransactionType::LotMerge.as_str().to_string()),
                        transaction_date: Set(now),
                        from_warehouse: Set(Some(warehouse.clone())),
                        to_warehouse: Set(Some(warehouse)),
                        part_id: Set(part_id),
                        lot_id: Set(Some(target_id)),
                        qty: Set(total),
                        reference_type: Set(None),
                        reference_id: Set(None),
                        cancel_reference_id: Set(None),
                        status: Set(EntryStatus::Done.as_str().to_string()),
                        reason: Set(None),
                        notes: Set(Some(format!(
                            "merged lots {} into lot {} (total {})",
                            consumed_numbers.join(", "),
                            target.lot_number,
                            total
                        ))),
                        created_by: Set(cmd.actor.clone()),
                        organization_id: Set(cmd.organization_id),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok((target, consumed_ids, total))
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(target = %target.id, total = %total, "lots merged");
        self.event_sender
            .send_or_log(Event::LotMerged {
                target_lot_id: target.id,
                consumed_lot_ids: consumed_ids,
                total_qty: total,
            })
            .await;

        Ok(target)
    }

    /// Places a lot on hold, blocking every stock-reducing operation until
    /// it is released.
    #[instrument(skip(self))]
    pub async fn hold(&self, lot_id: Uuid) -> Result<lot::Model, ServiceError> {
        let lot = self.load(lot_id).await?;
        if lot.is_depleted() {
            return Err(ServiceError::InvalidState(format!(
                "lot {} is depleted and cannot be held",
                lot.lot_number
            )));
        }
        let mut active: lot::ActiveModel = lot.into();
        active.status = Set(LotStatus::Hold.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Releases a held lot; the status falls back to what its quantity
    /// implies.
    #[instrument(skip(self))]
    pub async fn release(&self, lot_id: Uuid) -> Result<lot::Model, ServiceError> {
        let lot = self.load(lot_id).await?;
        if !lot.is_on_hold() {
            return Err(ServiceError::InvalidState(format!(
                "lot {} is not on hold",
                lot.lot_number
            )));
        }
        let status = LotStatus::for_quantity(lot.current_qty);
        let mut active: lot::ActiveModel = lot.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Records a quality-inspection outcome on a lot.
    #[instrument(skip(self))]
    pub async fn set_inspection_status(
        &self,
        lot_id: Uuid,
        status: InspectionStatus,
    ) -> Result<lot::Model, ServiceError> {
        let lot = self.load(lot_id).await?;
        let mut active: lot::ActiveModel = lot.into();
        active.inspection_status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn load(&self, lot_id: Uuid) -> Result<lot::Model, ServiceError> {
        lot::Entity::find_by_id(lot_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lot {} not found", lot_id)))
    }
}

/// The single projection row holding a lot's stock. Split and merge operate
/// on one coordinate; a lot spread across warehouses must be consolidated
/// by transfers first.
async fn single_stocked_row<C: ConnectionTrait>(
    conn: &C,
    lot: &lot::Model,
) -> Result<stock_level::Model, ServiceError> {
    let rows = stock_level::Entity::find()
        .filter(stock_level::Column::OrganizationId.eq(lot.organization_id))
        .filter(stock_level::Column::LotId.eq(lot.id))
        .filter(stock_level::Column::Qty.gt(Decimal::ZERO))
        .lock_exclusive()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    match rows.len() {
        0 => Err(ServiceError::InvalidState(format!(
            "lot {} has no stocked coordinate",
            lot.lot_number
        ))),
        1 => Ok(rows.into_iter().next().ok_or_else(|| {
            ServiceError::InternalError("stock row vanished mid-read".to_string())
        })?),
        n => Err(ServiceError::InvalidState(format!(
            "lot {} is stocked at {} coordinates; consolidate before restructuring",
            lot.lot_number, n
        ))),
    }
}
