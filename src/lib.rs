//! LotLedger Core Library
//!
//! This crate provides the inventory transaction ledger, lot traceability,
//! and document numbering core for a manufacturing-operations backend. The
//! surrounding CRUD/API layer is an external caller of the services exposed
//! here.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Bundles the ledger core services over one database pool, for callers
/// that want a single handle to wire into their own application state.
#[derive(Clone)]
pub struct LedgerCore {
    pub db: Arc<DatabaseConnection>,
    pub sequences: Arc<services::sequence::SequenceService>,
    pub ledger: Arc<services::ledger::LedgerService>,
    pub counts: Arc<services::adjustment::StockCountService>,
    pub lots: Arc<services::lots::LotService>,
}

impl LedgerCore {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: events::EventSender) -> Self {
        let sequences = Arc::new(services::sequence::SequenceService::new(db.clone()));
        let ledger = Arc::new(services::ledger::LedgerService::new(
            db.clone(),
            sequences.clone(),
            event_sender.clone(),
        ));
        let counts = Arc::new(services::adjustment::StockCountService::new(
            db.clone(),
            sequences.clone(),
            event_sender.clone(),
        ));
        let lots = Arc::new(services::lots::LotService::new(
            db.clone(),
            sequences.clone(),
            event_sender,
        ));
        Self {
            db,
            sequences,
            ledger,
            counts,
            lots,
        }
    }
}
