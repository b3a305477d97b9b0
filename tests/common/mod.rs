#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lotledger::{
    config::AppConfig,
    db,
    entities::{lot, part, purchase_order_line, sequence_rule, stock_level},
    events::{self, Event},
    services::StockCoordinate,
    LedgerCore,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

pub const ORG: i64 = 1;

/// Harness wiring the ledger core to a fresh in-memory SQLite database with
/// the schema migrated and the standard numbering rules provisioned.
pub struct TestCore {
    pub core: LedgerCore,
    pub db: Arc<DatabaseConnection>,
    events: Receiver<Event>,
}

impl TestCore {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        cfg.auto_migrate = true;
        // A single connection keeps every handle on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let db = Arc::new(pool);

        let (sender, events) = events::channel(256);
        let core = LedgerCore::new(db.clone(), sender);

        let harness = Self { core, db, events };
        harness
            .seed_rule("TRANSACTION_NUMBER", "TX-{YYYY}{MM}{DD}-{SEQ}", 4, "DAILY")
            .await;
        harness.seed_rule("LOT_NUMBER", "LOT-{SEQ}", 6, "NONE").await;
        harness
    }

    pub async fn seed_rule(&self, rule_type: &str, pattern: &str, length: i32, policy: &str) {
        let now = Utc::now();
        sequence_rule::ActiveModel {
            rule_type: Set(rule_type.to_string()),
            pattern: Set(pattern.to_string()),
            prefix: Set(None),
            suffix: Set(None),
            sequence_length: Set(length),
            current_sequence: Set(0),
            reset_policy: Set(policy.to_string()),
            last_reset_at: Set(None),
            active: Set(true),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed sequence rule");
    }

    pub async fn backdate_rule(&self, rule_type: &str, last_reset_at: DateTime<Utc>, sequence: i64) {
        let rule = sequence_rule::Entity::find()
            .filter(sequence_rule::Column::RuleType.eq(rule_type))
            .one(self.db.as_ref())
            .await
            .expect("rule lookup failed")
            .expect("rule missing");
        let mut active: sequence_rule::ActiveModel = rule.into();
        active.last_reset_at = Set(Some(last_reset_at));
        active.current_sequence = Set(sequence);
        active
            .update(self.db.as_ref())
            .await
            .expect("failed to backdate rule");
    }

    pub async fn seed_part(&self, part_number: &str, splittable: bool) -> Uuid {
        let now = Utc::now();
        let model = part::ActiveModel {
            id: Set(Uuid::new_v4()),
            part_number: Set(part_number.to_string()),
            description: Set(None),
            splittable: Set(splittable),
            lot_tracked: Set(true),
            organization_id: Set(ORG),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed part");
        model.id
    }

    pub async fn seed_po_line(&self, part_id: Uuid, ordered: Decimal) -> Uuid {
        let now = Utc::now();
        let model = purchase_order_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set("PO-1001".to_string()),
            line_no: Set(1),
            part_id: Set(part_id),
            ordered_qty: Set(ordered),
            received_qty: Set(dec!(0)),
            status: Set("OPEN".to_string()),
            organization_id: Set(ORG),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed purchase order line");
        model.id
    }

    pub async fn lot(&self, lot_id: Uuid) -> lot::Model {
        lot::Entity::find_by_id(lot_id)
            .one(self.db.as_ref())
            .await
            .expect("lot lookup failed")
            .expect("lot missing")
    }

    pub async fn po_line(&self, id: Uuid) -> purchase_order_line::Model {
        purchase_order_line::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("po line lookup failed")
            .expect("po line missing")
    }

    pub async fn stock_row(
        &self,
        warehouse: &str,
        part_id: Uuid,
        lot_id: Option<Uuid>,
    ) -> Option<stock_level::Model> {
        let mut query = stock_level::Entity::find()
            .filter(stock_level::Column::OrganizationId.eq(ORG))
            .filter(stock_level::Column::WarehouseCode.eq(warehouse))
            .filter(stock_level::Column::PartId.eq(part_id));
        query = match lot_id {
            Some(id) => query.filter(stock_level::Column::LotId.eq(id)),
            None => query.filter(stock_level::Column::LotId.is_null()),
        };
        query
            .one(self.db.as_ref())
            .await
            .expect("stock lookup failed")
    }

    pub async fn stock_qty(&self, warehouse: &str, part_id: Uuid, lot_id: Option<Uuid>) -> Decimal {
        self.stock_row(warehouse, part_id, lot_id)
            .await
            .map(|row| row.qty)
            .unwrap_or(dec!(0))
    }

    pub fn coordinate(&self, warehouse: &str, part_id: Uuid, lot_id: Option<Uuid>) -> StockCoordinate {
        StockCoordinate::new(ORG, warehouse, part_id, lot_id)
    }
}
