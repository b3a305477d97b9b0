pub mod adjustment;
pub mod ledger;
pub mod lots;
pub mod sequence;

mod stock_state;

pub use stock_state::StockCoordinate;

pub use adjustment::StockCountService;
pub use ledger::LedgerService;
pub use lots::LotService;
pub use sequence::SequenceService;
