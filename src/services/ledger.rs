//! The append-only transaction ledger and its core stock movements:
//! receive, issue, transfer (issue with a destination), and cancel
//! (reversal). Every operation runs inside one database transaction; the
//! store's row locks are the only concurrency control, so operations on
//! disjoint coordinates proceed fully in parallel.

use crate::db::DbPool;
use crate::entities::{
    ledger_entry::{self, EntryStatus, TransactionType},
    lot::{self, LotStatus},
    purchase_order_line::{self, PoLineStatus},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::sequence::{rule_types, SequenceService};
use crate::services::stock_state::{self, StockCoordinate};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Reference type linking a receipt to the purchase-order line it fulfils.
/// Receipts carrying it update the line's received position, and cancelling
/// them rolls that position back.
pub const PO_LINE_REFERENCE: &str = "PURCHASE_ORDER_LINE";

/// Link to a business document that caused a movement.
#[derive(Debug, Clone)]
pub struct Reference {
    pub reference_type: String,
    pub reference_id: Uuid,
}

/// Lot identity for a receipt: reuse the named lot when it already exists,
/// otherwise create it (minting a number when none is given).
#[derive(Debug, Clone, Default)]
pub struct LotSpec {
    pub lot_number: Option<String>,
    pub vendor: Option<String>,
    pub supplier_lot_number: Option<String>,
    pub origin_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ReceiveStock {
    pub organization_id: i64,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub qty: Decimal,
    pub lot: Option<LotSpec>,
    pub reference: Option<Reference>,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct IssueStock {
    pub organization_id: i64,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub qty: Decimal,
    pub lot_id: Option<Uuid>,
    /// When set, the movement is a transfer into this warehouse instead of
    /// a consumption.
    pub destination_warehouse: Option<String>,
    pub reference: Option<Reference>,
    pub actor: String,
}

/// Service for posting and reversing ledger entries.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DbPool>,
    sequences: Arc<SequenceService>,
    event_sender: EventSender,
}

impl LedgerService {
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

    /// Records a receipt of stock into a warehouse, creating or topping up
    /// the lot and the stock projection at the destination coordinate.
    /// Receipts only add, so there is no insufficient-stock failure path.
    #[instrument(skip(self, cmd), fields(warehouse = %cmd.warehouse_code, part = %cmd.part_id))]
    pub async fn receive(&self, cmd: ReceiveStock) -> Result<ledger_entry::Model, ServiceError> {
        if cmd.qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "receive quantity must be positive, got {}",
                cmd.qty
            )));
        }

        let sequences = self.sequences.clone();
        let entry = self
            .db
            .transaction::<_, ledger_entry::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let number = sequences
                        .next_number_in(txn, rule_types::TRANSACTION, &cmd.actor)
                        .await?;

                    let lot_id = match &cmd.lot {
                        Some(spec) => Some(
                            create_or_top_up_lot(txn, &sequences, &cmd, spec).await?,
                        ),
                        None => None,
                    };

                    let entry = ledger_entry::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transaction_number: Set(number),
                        transaction_type: Set(TransactionType::Receive.as_str().to_string()),
                        transaction_date: Set(Utc::now()),
                        from_warehouse: Set(None),
                        to_warehouse: Set(Some(cmd.warehouse_code.clone())),
                        part_id: Set(cmd.part_id),
                        lot_id: Set(lot_id),
                        qty: Set(cmd.qty),
                        reference_type: Set(cmd
                            .reference
                            .as_ref()
                            .map(|r| r.reference_type.clone())),
                        reference_id: Set(cmd.reference.as_ref().map(|r| r.reference_id)),
                        cancel_reference_id: Set(None),
                        status: Set(EntryStatus::Done.as_str().to_string()),
                        reason: Set(None),
                        notes: Set(None),
                        created_by: Set(cmd.actor.clone()),
                        organization_id: Set(cmd.organization_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let coord = StockCoordinate::new(
                        cmd.organization_id,
                        cmd.warehouse_code.clone(),
                        cmd.part_id,
                        lot_id,
                    );
                    stock_state::apply_delta(txn, &coord, cmd.qty, None).await?;

                    if let Some(reference) = &cmd.reference {
                        if reference.reference_type == PO_LINE_REFERENCE {
                            apply_po_receipt(txn, reference.reference_id, cmd.qty).await?;
                        }
                    }

                    Ok(entry)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            transaction_number = %entry.transaction_number,
            qty = %entry.qty,
            "stock received"
        );
        self.event_sender
            .send_or_log(Event::StockReceived {
                entry_id: entry.id,
                warehouse: entry.to_warehouse.clone().unwrap_or_default(),
                part_id: entry.part_id,
                lot_id: entry.lot_id,
                qty: entry.qty,
            })
            .await;

        Ok(entry)
    }

    /// Issues stock out of a warehouse, or transfers it when a destination
    /// is given. A transfer is recorded as ONE entry with both warehouse
    /// ends populated, never as two unrelated entries. Never partially
    /// fulfils: the full quantity must be available at the source.
    #[instrument(skip(self, cmd), fields(warehouse = %cmd.warehouse_code, part = %cmd.part_id))]
    pub async fn issue(&self, cmd: IssueStock) -> Result<ledger_entry::Model, ServiceError> {
        self.post_outbound(cmd, false).await
    }

    /// Scraps stock: an outbound consumption recorded under its own
    /// transaction type so waste shows up separately in the ledger.
    #[instrument(skip(self, cmd), fields(warehouse = %cmd.warehouse_code, part = %cmd.part_id))]
    pub async fn scrap(&self, cmd: IssueStock) -> Result<ledger_entry::Model, ServiceError> {
        if cmd.destination_warehouse.is_some() {
            return Err(ServiceError::ValidationError(
                "scrap cannot carry a destination warehouse".to_string(),
            ));
        }
        self.post_outbound(cmd, true).await
    }

    async fn post_outbound(
        &self,
        cmd: IssueStock,
        scrap: bool,
    ) -> Result<ledger_entry::Model, ServiceError> {
        if cmd.qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "issue quantity must be positive, got {}",
                cmd.qty
            )));
        }
        if cmd.destination_warehouse.as_deref() == Some(cmd.warehouse_code.as_str()) {
            return Err(ServiceError::ValidationError(
                "transfer destination must differ from the source warehouse".to_string(),
            ));
        }

        let sequences = self.sequences.clone();
        let entry = self
            .db
            .transaction::<_, ledger_entry::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let lot = match cmd.lot_id {
                        Some(lot_id) => {
                            let lot = lot::Entity::find_by_id(lot_id)
                                .lock_exclusive()
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!("Lot {} not found", lot_id))
                                })?;
                            if lot.part_id != cmd.part_id {
                                return Err(ServiceError::PartMismatch(format!(
                                    "lot {} belongs to part {}, not {}",
                                    lot.lot_number, lot.part_id, cmd.part_id
                                )));
                            }
                            if lot.is_on_hold() {
                                return Err(ServiceError::InvalidState(format!(
                                    "lot {} is on hold",
                                    lot.lot_number
                                )));
                            }
                            Some(lot)
                        }
                        None => None,
                    };

                    let is_transfer = cmd.destination_warehouse.is_some();
                    if !is_transfer {
                        if let Some(lot) = &lot {
                            if lot.current_qty < cmd.qty {
                                return Err(ServiceError::InsufficientQuantity {
                                    lot_number: lot.lot_number.clone(),
                                    available: lot.current_qty,
                                    requested: cmd.qty,
                                });
                            }
                        }
                    }

                    let source = StockCoordinate::new(
                        cmd.organization_id,
                        cmd.warehouse_code.clone(),
                        cmd.part_id,
                        cmd.lot_id,
                    );
                    stock_state::require_available(
                        txn,
                        &source,
                        cmd.qty,
                        lot.as_ref().map(|l| l.lot_number.as_str()),
                    )
                    .await?;

                    let number = sequences
                        .next_number_in(txn, rule_types::TRANSACTION, &cmd.actor)
                        .await?;

                    let (transaction_type, signed_qty) = if is_transfer {
                        (TransactionType::Transfer, cmd.qty)
                    } else if scrap {
                        (TransactionType::Scrap, -cmd.qty)
                    } else {
                        (TransactionType::Issue, -cmd.qty)
                    };

                    let entry = ledger_entry::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transaction_number: Set(number),
                        transaction_type: Set(transaction_type.as_str().to_string()),
                        transaction_date: Set(Utc::now()),
                        from_warehouse: Set(Some(cmd.warehouse_code.clone())),
                        to_warehouse: Set(cmd.destination_warehouse.clone()),
                        part_id: Set(cmd.part_id),
                        lot_id: Set(cmd.lot_id),
                        qty: Set(signed_qty),
                        reference_type: Set(cmd
                            .reference
                            .as_ref()
                            .map(|r| r.reference_type.clone())),
                        reference_id: Set(cmd.reference.as_ref().map(|r| r.reference_id)),
                        cancel_reference_id: Set(None),
                        status: Set(EntryStatus::Done.as_str().to_string()),
                        reason: Set(None),
                        notes: Set(None),
                        created_by: Set(cmd.actor.clone()),
                        organization_id: Set(cmd.organization_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    stock_state::apply_delta(
                        txn,
                        &source,
                        -cmd.qty,
                        lot.as_ref().map(|l| l.lot_number.as_str()),
                    )
                    .await?;

                    if let Some(destination) = &cmd.destination_warehouse {
                        let dest = StockCoordinate::new(
                            cmd.organization_id,
                            destination.clone(),
                            cmd.part_id,
                            cmd.lot_id,
                        );
                        stock_state::apply_delta(txn, &dest, cmd.qty, None).await?;
                    } else if let Some(lot) = lot {
                        // Pure issue consumes the lot; a transfer only moves it.
                        stock_state::apply_lot_delta(txn, lot, -cmd.qty, Decimal::ZERO).await?;
                    }

                    Ok(entry)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            transaction_number = %entry.transaction_number,
            transaction_type = %entry.transaction_type,
            qty = %entry.qty,
            "stock issued"
        );
        let event = match (&entry.from_warehouse, &entry.to_warehouse) {
            (Some(from), Some(to)) => Event::StockTransferred {
                entry_id: entry.id,
                from_warehouse: from.clone(),
                to_warehouse: to.clone(),
                part_id: entry.part_id,
                lot_id: entry.lot_id,
                qty: entry.moved_qty(),
            },
            _ => Event::StockIssued {
                entry_id: entry.id,
                warehouse: entry.from_warehouse.clone().unwrap_or_default(),
                part_id: entry.part_id,
                lot_id: entry.lot_id,
                qty: entry.moved_qty(),
            },
        };
        self.event_sender.send_or_log(event).await;

        Ok(entry)
    }

    /// Reverses a DONE ledger entry. Strictly additive: the original row is
    /// only status-flipped, and a new equal-and-opposite entry is appended
    /// with `cancel_reference_id` pointing at it. Both rows of the pair end
    /// up CANCELED, so DONE entries alone always sum to the projection.
    /// Fails when reversing would drive a projection negative, which can
    /// legitimately happen if the stock already moved on.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        entry_id: Uuid,
        reason: &str,
        actor: &str,
    ) -> Result<ledger_entry::Model, ServiceError> {
        let reason = reason.to_string();
        let actor = actor.to_string();
        let sequences = self.sequences.clone();

        let reversal = self
            .db
            .transaction::<_, ledger_entry::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let original = ledger_entry::Entity::find_by_id(entry_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Ledger entry {} not found", entry_id))
                        })?;

                    if !original.is_done() {
                        return Err(ServiceError::AlreadyCanceled(entry_id));
                    }

                    let original_type = original.transaction_type().ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "entry {} has unknown transaction type '{}'",
                            entry_id, original.transaction_type
                        ))
                    })?;
                    let reversal_type = original_type.reversal().ok_or_else(|| {
                        ServiceError::InvalidState(format!(
                            "{} entries cannot be canceled",
                            original.transaction_type
                        ))
                    })?;

                    let mut flip: ledger_entry::ActiveModel = original.clone().into();
                    flip.status = Set(EntryStatus::Canceled.as_str().to_string());
                    flip.update(txn).await.map_err(ServiceError::db_error)?;

                    let number = sequences
                        .next_number_in(txn, rule_types::TRANSACTION, &actor)
                        .await?;

                    let reversal = ledger_entry::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transaction_number: Set(number),
                        transaction_type: Set(reversal_type.as_str().to_string()),
                        transaction_date: Set(Utc::now()),
                        from_warehouse: Set(original.to_warehouse.clone()),
                        to_warehouse: Set(original.from_warehouse.clone()),
                        part_id: Set(original.part_id),
                        lot_id: Set(original.lot_id),
                        qty: Set(-original.qty),
                        reference_type: Set(original.reference_type.clone()),
                        reference_id: Set(original.reference_id),
                        cancel_reference_id: Set(Some(original.id)),
                        status: Set(EntryStatus::Canceled.as_str().to_string()),
                        reason: Set(Some(reason.clone())),
                        notes: Set(None),
                        created_by: Set(actor.clone()),
                        organization_id: Set(original.organization_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    reverse_projection(txn, &original).await?;
                    reverse_lot_effect(txn, &original, original_type).await?;

                    if original_type == TransactionType::Receive {
                        if let (Some(ref_type), Some(ref_id)) =
                            (&original.reference_type, original.reference_id)
                        {
                            if ref_type == PO_LINE_REFERENCE {
                                apply_po_receipt(txn, ref_id, -original.qty).await?;
                            }
                        }
                    }

                    Ok(reversal)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            original = %entry_id,
            reversal = %reversal.id,
            transaction_number = %reversal.transaction_number,
            "ledger entry canceled"
        );
        self.event_sender
            .send_or_log(Event::EntryCanceled {
                original_entry_id: entry_id,
                reversal_entry_id: reversal.id,
                reason: reversal.reason.clone().unwrap_or_default(),
            })
            .await;

        Ok(reversal)
    }
}

/// Undoes the projection deltas an entry applied: the original decremented
/// `moved_qty` at `from` and incremented it at `to`, so the reversal does
/// the opposite, rejecting before any coordinate would go negative.
async fn reverse_projection<C: ConnectionTrait>(
    conn: &C,
    original: &ledger_entry::Model,
) -> Result<(), ServiceError> {
    let moved = original.moved_qty();
    if let Some(to) = &original.to_warehouse {
        let coord = StockCoordinate::new(
            original.organization_id,
            to.clone(),
            original.part_id,
            original.lot_id,
        );
        stock_state::apply_delta(conn, &coord, -moved, None).await?;
    }
    if let Some(from) = &original.from_warehouse {
        let coord = StockCoordinate::new(
            original.organization_id,
            from.clone(),
            original.part_id,
            original.lot_id,
        );
        stock_state::apply_delta(conn, &coord, moved, None).await?;
    }
    Ok(())
}

/// Undoes the lot-quantity change an entry applied, restoring
/// DEPLETED -> NORMAL when quantity comes back.
async fn reverse_lot_effect<C: ConnectionTrait>(
    conn: &C,
    original: &ledger_entry::Model,
    original_type: TransactionType,
) -> Result<(), ServiceError> {
    let lot_id = match original.lot_id {
        Some(lot_id) => lot_id,
        None => return Ok(()),
    };
    // Transfers move a lot between warehouses without consuming it.
    if original_type == TransactionType::Transfer {
        return Ok(());
    }

    let lot = lot::Entity::find_by_id(lot_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Lot {} not found", lot_id)))?;

    // Receipts were folded into initial_qty as well; consumptions and
    // adjustments only touched current_qty.
    let initial_delta = match original_type {
        TransactionType::Receive => -original.qty,
        _ => Decimal::ZERO,
    };
    stock_state::apply_lot_delta(conn, lot, -original.qty, initial_delta).await?;
    Ok(())
}

/// Creates the lot for a receipt, or folds the received quantity into an
/// existing lot with the same number (both `initial_qty` and `current_qty`
/// rise, keeping the received-so-far audit trail additive).
async fn create_or_top_up_lot<C: ConnectionTrait>(
    conn: &C,
    sequences: &SequenceService,
    cmd: &ReceiveStock,
    spec: &LotSpec,
) -> Result<Uuid, ServiceError> {
    if let Some(lot_number) = &spec.lot_number {
        let existing = lot::Entity::find()
            .filter(lot::Column::OrganizationId.eq(cmd.organization_id))
            .filter(lot::Column::LotNumber.eq(lot_number.clone()))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?;
        if let Some(lot) = existing {
            if lot.part_id != cmd.part_id {
                return Err(ServiceError::PartMismatch(format!(
                    "lot {} belongs to part {}, not {}",
                    lot.lot_number, lot.part_id, cmd.part_id
                )));
            }
            let lot_id = lot.id;
            stock_state::apply_lot_delta(conn, lot, cmd.qty, cmd.qty).await?;
            return Ok(lot_id);
        }
    }

    let lot_number = match &spec.lot_number {
        Some(lot_number) => lot_number.clone(),
        None => {
            sequences
                .next_number_in(conn, rule_types::LOT, &cmd.actor)
                .await?
        }
    };

    let now = Utc::now();
    let lot = lot::ActiveModel {
        id: Set(Uuid::new_v4()),
        lot_number: Set(lot_number),
        part_id: Set(cmd.part_id),
        initial_qty: Set(cmd.qty),
        current_qty: Set(cmd.qty),
        status: Set(LotStatus::Normal.as_str().to_string()),
        inspection_status: Set(lot::InspectionStatus::Pending.as_str().to_string()),
        vendor: Set(spec.vendor.clone()),
        supplier_lot_number: Set(spec.supplier_lot_number.clone()),
        origin_date: Set(spec.origin_date),
        expiry_date: Set(spec.expiry_date),
        organization_id: Set(cmd.organization_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    Ok(lot.id)
}

/// Moves a purchase-order line's received position by `delta` (positive on
/// receipt, negative when a receipt is reversed) and recomputes its status.
async fn apply_po_receipt<C: ConnectionTrait>(
    conn: &C,
    po_line_id: Uuid,
    delta: Decimal,
) -> Result<(), ServiceError> {
    let line = purchase_order_line::Entity::find_by_id(po_line_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Purchase order line {} not found", po_line_id))
        })?;

    let new_received = line.received_qty + delta;
    if new_received < Decimal::ZERO {
        return Err(ServiceError::InvalidState(format!(
            "purchase order line {} has received {} and cannot give back {}",
            po_line_id,
            line.received_qty,
            delta.abs()
        )));
    }
    let status = PoLineStatus::for_quantities(new_received, line.ordered_qty);

    let mut active: purchase_order_line::ActiveModel = line.into();
    active.received_qty = Set(new_received);
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)?;
    Ok(())
}
