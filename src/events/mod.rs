use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Events emitted by the ledger core after a unit of work commits.
/// Consumers (webhooks, projections, notifications) live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockReceived {
        entry_id: Uuid,
        warehouse: String,
        part_id: Uuid,
        lot_id: Option<Uuid>,
        qty: Decimal,
    },
    StockIssued {
        entry_id: Uuid,
        warehouse: String,
        part_id: Uuid,
        lot_id: Option<Uuid>,
        qty: Decimal,
    },
    StockTransferred {
        entry_id: Uuid,
        from_warehouse: String,
        to_warehouse: String,
        part_id: Uuid,
        lot_id: Option<Uuid>,
        qty: Decimal,
    },
    EntryCanceled {
        original_entry_id: Uuid,
        reversal_entry_id: Uuid,
        reason: String,
    },
    StockCounted {
        audit_id: Uuid,
        warehouse: String,
        part_id: Uuid,
        lot_id: Option<Uuid>,
        before_qty: Decimal,
        counted_qty: Decimal,
    },
    LotSplit {
        source_lot_id: Uuid,
        new_lot_id: Uuid,
        qty: Decimal,
    },
    LotMerged {
        target_lot_id: Uuid,
        consumed_lot_ids: Vec<Uuid>,
        total_qty: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing the caller. Used after
    /// commit, where the stock movement already happened and must not be
    /// reported as failed because a consumer went away.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event dropped");
        }
    }
}

/// Creates an event channel pair with the given buffer size.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
