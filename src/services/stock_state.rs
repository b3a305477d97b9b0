//! Shared maintenance logic for the materialized stock projection and for
//! lot quantities.
//!
//! Every mutating ledger operation funnels its projection effects through
//! [`apply_delta`] and its lot effects through [`apply_lot_delta`], so the
//! "never driven negative" invariants are checked in exactly one place,
//! inside the caller's open transaction.

use crate::entities::lot::{self, LotStatus};
use crate::entities::stock_level;
use crate::errors::ServiceError;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

/// A (warehouse, part, lot-or-none) stock coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCoordinate {
    pub organization_id: i64,
    pub warehouse_code: String,
    pub part_id: Uuid,
    pub lot_id: Option<Uuid>,
}

impl StockCoordinate {
    pub fn new(
        organization_id: i64,
        warehouse_code: impl Into<String>,
        part_id: Uuid,
        lot_id: Option<Uuid>,
    ) -> Self {
        Self {
            organization_id,
            warehouse_code: warehouse_code.into(),
            part_id,
            lot_id,
        }
    }
}

/// Looks up the projection row at a coordinate, if one was ever created.
/// Takes a row lock so the read-then-write callers do not race each other
/// under READ COMMITTED.
pub(crate) async fn find<C: ConnectionTrait>(
    conn: &C,
    coord: &StockCoordinate,
) -> Result<Option<stock_level::Model>, ServiceError> {
    let mut query = stock_level::Entity::find()
        .filter(stock_level::Column::OrganizationId.eq(coord.organization_id))
        .filter(stock_level::Column::WarehouseCode.eq(coord.warehouse_code.clone()))
        .filter(stock_level::Column::PartId.eq(coord.part_id));
    query = match coord.lot_id {
        Some(lot_id) => query.filter(stock_level::Column::LotId.eq(lot_id)),
        None => query.filter(stock_level::Column::LotId.is_null()),
    };
    query
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Applies a signed quantity delta at a coordinate, creating the row lazily
/// on the first positive movement. Fails with `InsufficientStock` before
/// writing anything that would leave `qty` negative.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    coord: &StockCoordinate,
    delta: Decimal,
    lot_number: Option<&str>,
) -> Result<stock_level::Model, ServiceError> {
    let existing = find(conn, coord).await?;

    match existing {
        Some(row) => {
            let new_qty = row.qty + delta;
            if new_qty < Decimal::ZERO {
                return Err(ServiceError::InsufficientStock {
                    warehouse: coord.warehouse_code.clone(),
                    part_id: coord.part_id,
                    lot_number: lot_number.map(str::to_string),
                    available: row.qty,
                    requested: delta.abs(),
                });
            }
            let mut active: stock_level::ActiveModel = row.clone().into();
            active.qty = Set(new_qty);
            active.available_qty = Set(new_qty - row.reserved_qty);
            active.updated_at = Set(Utc::now());
            active.update(conn).await.map_err(ServiceError::db_error)
        }
        None => {
            if delta < Decimal::ZERO {
                return Err(ServiceError::InsufficientStock {
                    warehouse: coord.warehouse_code.clone(),
                    part_id: coord.part_id,
                    lot_number: lot_number.map(str::to_string),
                    available: Decimal::ZERO,
                    requested: delta.abs(),
                });
            }
            let now = Utc::now();
            let row = stock_level::ActiveModel {
                id: Set(Uuid::new_v4()),
                warehouse_code: Set(coord.warehouse_code.clone()),
                part_id: Set(coord.part_id),
                lot_id: Set(coord.lot_id),
                qty: Set(delta),
                reserved_qty: Set(Decimal::ZERO),
                available_qty: Set(delta),
                last_counted_at: Set(None),
                organization_id: Set(coord.organization_id),
                created_at: Set(now),
                updated_at: Set(now),
            };
            row.insert(conn).await.map_err(ServiceError::db_error)
        }
    }
}

/// Availability precondition for stock-reducing operations: the requested
/// quantity must fit inside `available_qty` (on-hand minus reserved), not
/// merely inside `qty`.
pub(crate) async fn require_available<C: ConnectionTrait>(
    conn: &C,
    coord: &StockCoordinate,
    requested: Decimal,
    lot_number: Option<&str>,
) -> Result<stock_level::Model, ServiceError> {
    let row = find(conn, coord).await?;
    let available = row.as_ref().map(|r| r.available_qty).unwrap_or(Decimal::ZERO);
    if available < requested {
        return Err(ServiceError::InsufficientStock {
            warehouse: coord.warehouse_code.clone(),
            part_id: coord.part_id,
            lot_number: lot_number.map(str::to_string),
            available,
            requested,
        });
    }
    // row must exist when available covered a positive request
    row.ok_or_else(|| {
        ServiceError::InternalError(format!(
            "missing stock projection at {}/{}",
            coord.warehouse_code, coord.part_id
        ))
    })
}

/// Applies signed deltas to a lot's current and initial quantities and
/// recomputes its status. HOLD is sticky; otherwise the status tracks the
/// quantity (DEPLETED exactly at zero). A physical count that finds more
/// than was ever received grows `initial_qty` so `current_qty <=
/// initial_qty` keeps holding.
pub(crate) async fn apply_lot_delta<C: ConnectionTrait>(
    conn: &C,
    lot: lot::Model,
    current_delta: Decimal,
    initial_delta: Decimal,
) -> Result<lot::Model, ServiceError> {
    let new_current = lot.current_qty + current_delta;
    if new_current < Decimal::ZERO {
        return Err(ServiceError::InsufficientQuantity {
            lot_number: lot.lot_number,
            available: lot.current_qty,
            requested: current_delta.abs(),
        });
    }
    let mut new_initial = lot.initial_qty + initial_delta;
    if new_current > new_initial {
        new_initial = new_current;
    }

    let status = if lot.is_on_hold() {
        LotStatus::Hold
    } else {
        LotStatus::for_quantity(new_current)
    };

    let mut active: lot::ActiveModel = lot.into();
    active.current_qty = Set(new_current);
    active.initial_qty = Set(new_initial);
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)
}
