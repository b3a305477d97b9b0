mod common;

use assert_matches::assert_matches;
use common::{TestCore, ORG};
use lotledger::entities::ledger_entry::{self, EntryStatus, TransactionType};
use lotledger::errors::ServiceError;
use lotledger::services::ledger::{
    IssueStock, LotSpec, ReceiveStock, Reference, PO_LINE_REFERENCE,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

fn receive_cmd(part_id: Uuid, warehouse: &str, qty: Decimal, lot_number: Option<&str>) -> ReceiveStock {
    ReceiveStock {
        organization_id: ORG,
        warehouse_code: warehouse.to_string(),
        part_id,
        qty,
        lot: lot_number.map(|n| LotSpec {
            lot_number: Some(n.to_string()),
            ..LotSpec::default()
        }),
        reference: None,
        actor: "tester".to_string(),
    }
}

fn issue_cmd(part_id: Uuid, warehouse: &str, qty: Decimal, lot_id: Option<Uuid>) -> IssueStock {
    IssueStock {
        organization_id: ORG,
        warehouse_code: warehouse.to_string(),
        part_id,
        qty,
        lot_id,
        destination_warehouse: None,
        reference: None,
        actor: "tester".to_string(),
    }
}

async fn entry_count(db: &DatabaseConnection) -> usize {
    ledger_entry::Entity::find()
        .all(db)
        .await
        .expect("entry listing failed")
        .len()
}

/// Signed on-hand position at a coordinate as the DONE ledger entries tell
/// it: each entry subtracts its magnitude at `from` and adds it at `to`.
async fn ledger_sum(
    db: &DatabaseConnection,
    warehouse: &str,
    part_id: Uuid,
    lot_id: Option<Uuid>,
) -> Decimal {
    let entries = ledger_entry::Entity::find()
        .filter(ledger_entry::Column::PartId.eq(part_id))
        .filter(ledger_entry::Column::Status.eq(EntryStatus::Done.as_str()))
        .all(db)
        .await
        .expect("entry listing failed");
    let mut sum = dec!(0);
    for entry in entries {
        if entry.lot_id != lot_id {
            continue;
        }
        let moved = entry.moved_qty();
        if entry.from_warehouse.as_deref() == Some(warehouse) {
            sum -= moved;
        }
        if entry.to_warehouse.as_deref() == Some(warehouse) {
            sum += moved;
        }
    }
    sum
}

#[tokio::test]
async fn receive_issue_cancel_round_trip() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-01", true).await;

    let receipt = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(100), Some("L-100")))
        .await
        .expect("receive failed");
    assert_eq!(receipt.transaction_type, TransactionType::Receive.as_str());
    assert!(receipt.transaction_number.starts_with("TX-"));
    assert_eq!(receipt.qty, dec!(100));
    assert_eq!(receipt.from_warehouse, None);
    assert_eq!(receipt.to_warehouse.as_deref(), Some("WH1"));

    let lot_id = receipt.lot_id.expect("receipt should carry a lot");
    let lot = t.lot(lot_id).await;
    assert_eq!(lot.lot_number, "L-100");
    assert_eq!(lot.initial_qty, dec!(100));
    assert_eq!(lot.current_qty, dec!(100));
    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(100));

    let issue = t
        .core
        .ledger
        .issue(issue_cmd(part_id, "WH1", dec!(30), Some(lot_id)))
        .await
        .expect("issue failed");
    assert_eq!(issue.transaction_type, TransactionType::Issue.as_str());
    assert_eq!(issue.qty, dec!(-30));
    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(70));
    assert_eq!(t.lot(lot_id).await.current_qty, dec!(70));

    let reversal = t
        .core
        .ledger
        .cancel(issue.id, "keyed against wrong work order", "tester")
        .await
        .expect("cancel failed");
    assert_eq!(
        reversal.transaction_type,
        TransactionType::IssueCancel.as_str()
    );
    assert_eq!(reversal.qty, dec!(30));
    assert_eq!(reversal.cancel_reference_id, Some(issue.id));
    // The pair carries CANCELED together, so DONE entries sum to the book.
    assert_eq!(reversal.status, EntryStatus::Canceled.as_str());

    let original = ledger_entry::Entity::find_by_id(issue.id)
        .one(t.db.as_ref())
        .await
        .expect("entry lookup failed")
        .expect("entry missing");
    assert_eq!(original.status, EntryStatus::Canceled.as_str());

    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(100));
    let lot = t.lot(lot_id).await;
    assert_eq!(lot.current_qty, dec!(100));
    assert_eq!(lot.status, "NORMAL");
}

#[tokio::test]
async fn cancel_is_single_shot() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-02", true).await;

    let receipt = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(10), None))
        .await
        .expect("receive failed");
    let reversal = t
        .core
        .ledger
        .cancel(receipt.id, "duplicate receipt", "tester")
        .await
        .expect("cancel failed");

    let err = t
        .core
        .ledger
        .cancel(receipt.id, "again", "tester")
        .await
        .expect_err("second cancel must fail");
    assert_matches!(err, ServiceError::AlreadyCanceled(id) if id == receipt.id);

    // Reversal entries are terminal; undoing a cancel means re-posting.
    let err = t
        .core
        .ledger
        .cancel(reversal.id, "undo the undo", "tester")
        .await
        .expect_err("canceling a reversal must fail");
    assert_matches!(err, ServiceError::AlreadyCanceled(id) if id == reversal.id);
}

#[tokio::test]
async fn insufficient_stock_posts_nothing() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-03", true).await;

    t.core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(50), None))
        .await
        .expect("receive failed");
    let before = entry_count(t.db.as_ref()).await;

    let err = t
        .core
        .ledger
        .issue(issue_cmd(part_id, "WH1", dec!(80), None))
        .await
        .expect_err("overdraw must fail");
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available,
            requested,
            ..
        } if available == dec!(50) && requested == dec!(80)
    );

    // The failed transaction must leave no trace.
    assert_eq!(entry_count(t.db.as_ref()).await, before);
    assert_eq!(t.stock_qty("WH1", part_id, None).await, dec!(50));
}

#[tokio::test]
async fn transfer_is_one_entry_with_both_ends() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-04", true).await;

    let receipt = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(50), Some("L-200")))
        .await
        .expect("receive failed");
    let lot_id = receipt.lot_id.unwrap();

    let mut cmd = issue_cmd(part_id, "WH1", dec!(20), Some(lot_id));
    cmd.destination_warehouse = Some("WH2".to_string());
    let transfer = t.core.ledger.issue(cmd).await.expect("transfer failed");

    assert_eq!(transfer.transaction_type, TransactionType::Transfer.as_str());
    assert_eq!(transfer.from_warehouse.as_deref(), Some("WH1"));
    assert_eq!(transfer.to_warehouse.as_deref(), Some("WH2"));
    assert_eq!(transfer.qty, dec!(20));

    let transfers = ledger_entry::Entity::find()
        .filter(ledger_entry::Column::TransactionType.eq(TransactionType::Transfer.as_str()))
        .all(t.db.as_ref())
        .await
        .expect("entry listing failed");
    assert_eq!(transfers.len(), 1);

    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(30));
    assert_eq!(t.stock_qty("WH2", part_id, Some(lot_id)).await, dec!(20));
    // Moving a lot between warehouses does not consume it.
    assert_eq!(t.lot(lot_id).await.current_qty, dec!(50));

    t.core
        .ledger
        .cancel(transfer.id, "wrong destination", "tester")
        .await
        .expect("cancel failed");
    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(50));
    assert_eq!(t.stock_qty("WH2", part_id, Some(lot_id)).await, dec!(0));
    assert_eq!(t.lot(lot_id).await.current_qty, dec!(50));
}

#[tokio::test]
async fn projection_agrees_with_ledger() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-05", true).await;

    let receipt = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(100), Some("L-300")))
        .await
        .expect("receive failed");
    let lot_id = receipt.lot_id.unwrap();

    let issue = t
        .core
        .ledger
        .issue(issue_cmd(part_id, "WH1", dec!(30), Some(lot_id)))
        .await
        .expect("issue failed");

    let mut cmd = issue_cmd(part_id, "WH1", dec!(20), Some(lot_id));
    cmd.destination_warehouse = Some("WH2".to_string());
    t.core.ledger.issue(cmd).await.expect("transfer failed");

    t.core
        .ledger
        .cancel(issue.id, "miscount", "tester")
        .await
        .expect("cancel failed");

    for warehouse in ["WH1", "WH2"] {
        assert_eq!(
            t.stock_qty(warehouse, part_id, Some(lot_id)).await,
            ledger_sum(t.db.as_ref(), warehouse, part_id, Some(lot_id)).await,
            "projection diverged from ledger at {warehouse}"
        );
    }
}

#[tokio::test]
async fn receiving_against_po_line_tracks_the_line() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-06", true).await;
    let line_id = t.seed_po_line(part_id, dec!(100)).await;

    let mut cmd = receive_cmd(part_id, "WH1", dec!(40), None);
    cmd.reference = Some(Reference {
        reference_type: PO_LINE_REFERENCE.to_string(),
        reference_id: line_id,
    });
    let first = t.core.ledger.receive(cmd).await.expect("receive failed");

    let line = t.po_line(line_id).await;
    assert_eq!(line.received_qty, dec!(40));
    assert_eq!(line.status, "PARTIAL");

    let mut cmd = receive_cmd(part_id, "WH1", dec!(60), None);
    cmd.reference = Some(Reference {
        reference_type: PO_LINE_REFERENCE.to_string(),
        reference_id: line_id,
    });
    t.core.ledger.receive(cmd).await.expect("receive failed");

    let line = t.po_line(line_id).await;
    assert_eq!(line.received_qty, dec!(100));
    assert_eq!(line.status, "RECEIVED");

    // Reversing a receipt gives the quantity back to the line.
    t.core
        .ledger
        .cancel(first.id, "damaged on arrival", "tester")
        .await
        .expect("cancel failed");
    let line = t.po_line(line_id).await;
    assert_eq!(line.received_qty, dec!(60));
    assert_eq!(line.status, "PARTIAL");
}

#[tokio::test]
async fn scrap_is_recorded_under_its_own_type() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-07", true).await;

    t.core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(30), None))
        .await
        .expect("receive failed");

    let scrap = t
        .core
        .ledger
        .scrap(issue_cmd(part_id, "WH1", dec!(10), None))
        .await
        .expect("scrap failed");
    assert_eq!(scrap.transaction_type, TransactionType::Scrap.as_str());
    assert_eq!(scrap.qty, dec!(-10));
    assert_eq!(t.stock_qty("WH1", part_id, None).await, dec!(20));

    t.core
        .ledger
        .cancel(scrap.id, "scrapped the wrong bin", "tester")
        .await
        .expect("cancel failed");
    assert_eq!(t.stock_qty("WH1", part_id, None).await, dec!(30));
}

#[tokio::test]
async fn repeated_receipt_tops_up_the_lot() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-08", true).await;

    let first = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(50), Some("L-400")))
        .await
        .expect("receive failed");
    let second = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(25), Some("L-400")))
        .await
        .expect("receive failed");

    assert_eq!(first.lot_id, second.lot_id);
    let lot = t.lot(first.lot_id.unwrap()).await;
    assert_eq!(lot.current_qty, dec!(75));
    assert_eq!(lot.initial_qty, dec!(75));

    // The same lot number on a different part is someone else's lot.
    let other_part = t.seed_part("GEAR-08B", true).await;
    let err = t
        .core
        .ledger
        .receive(receive_cmd(other_part, "WH1", dec!(5), Some("L-400")))
        .await
        .expect_err("cross-part lot reuse must fail");
    assert_matches!(err, ServiceError::PartMismatch(_));
}

#[tokio::test]
async fn receipt_without_lot_number_mints_one() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-09", true).await;

    let cmd = ReceiveStock {
        organization_id: ORG,
        warehouse_code: "WH1".to_string(),
        part_id,
        qty: dec!(10),
        lot: Some(LotSpec::default()),
        reference: None,
        actor: "tester".to_string(),
    };
    let receipt = t.core.ledger.receive(cmd).await.expect("receive failed");
    let lot = t.lot(receipt.lot_id.unwrap()).await;
    assert_eq!(lot.lot_number, "LOT-000001");
}

#[tokio::test]
async fn movement_commands_are_validated() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-10", true).await;

    let err = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(0), None))
        .await
        .expect_err("zero receive must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = t
        .core
        .ledger
        .issue(issue_cmd(part_id, "WH1", dec!(-5), None))
        .await
        .expect_err("negative issue must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut cmd = issue_cmd(part_id, "WH1", dec!(5), None);
    cmd.destination_warehouse = Some("WH1".to_string());
    let err = t
        .core
        .ledger
        .issue(cmd)
        .await
        .expect_err("self-transfer must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut cmd = issue_cmd(part_id, "WH1", dec!(5), None);
    cmd.destination_warehouse = Some("WH2".to_string());
    let err = t
        .core
        .ledger
        .scrap(cmd)
        .await
        .expect_err("scrap with destination must fail");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn concurrent_issues_never_overdraw() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-12", true).await;

    t.core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(100), None))
        .await
        .expect("receive failed");

    // Two issues of 60 against 100 on hand: only one may clear, the other
    // has to see the post-issue balance and be refused.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let ledger = t.core.ledger.clone();
        let cmd = issue_cmd(part_id, "WH1", dec!(60), None);
        handles.push(tokio::spawn(async move { ledger.issue(cmd).await }));
    }
    let results = futures::future::join_all(handles).await;

    let mut succeeded = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(err) => assert_matches!(err, ServiceError::InsufficientStock { .. }),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(t.stock_qty("WH1", part_id, None).await, dec!(40));
}

#[tokio::test]
async fn cancel_rejects_when_stock_already_moved_on() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-13", true).await;

    let receipt = t
        .core
        .ledger
        .receive(receive_cmd(part_id, "WH1", dec!(100), Some("L-500")))
        .await
        .expect("receive failed");
    let lot_id = receipt.lot_id.unwrap();

    let mut cmd = issue_cmd(part_id, "WH1", dec!(80), Some(lot_id));
    cmd.destination_warehouse = Some("WH2".to_string());
    t.core.ledger.issue(cmd).await.expect("transfer failed");

    // Only 20 remain at the receiving warehouse; reversing the 100-unit
    // receipt would drive it negative.
    let err = t
        .core
        .ledger
        .cancel(receipt.id, "vendor recall", "tester")
        .await
        .expect_err("cancel must fail once the stock moved on");
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available,
            requested,
            ..
        } if available == dec!(20) && requested == dec!(100)
    );

    // The refused cancel must change nothing, including the status flip.
    assert_eq!(t.stock_qty("WH1", part_id, Some(lot_id)).await, dec!(20));
    assert_eq!(t.stock_qty("WH2", part_id, Some(lot_id)).await, dec!(80));
    assert_eq!(t.lot(lot_id).await.current_qty, dec!(100));
    let original = ledger_entry::Entity::find_by_id(receipt.id)
        .one(t.db.as_ref())
        .await
        .expect("entry lookup failed")
        .expect("entry missing");
    assert_eq!(original.status, EntryStatus::Done.as_str());
}

#[tokio::test]
async fn issuing_an_unknown_lot_fails() {
    let t = TestCore::new().await;
    let part_id = t.seed_part("GEAR-11", true).await;

    let err = t
        .core
        .ledger
        .issue(issue_cmd(part_id, "WH1", dec!(1), Some(Uuid::new_v4())))
        .await
        .expect_err("unknown lot must fail");
    assert_matches!(err, ServiceError::NotFound(_));
}
