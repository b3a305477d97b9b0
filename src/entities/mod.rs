pub mod count_audit;
pub mod ledger_entry;
pub mod lot;
pub mod part;
pub mod purchase_order_line;
pub mod sequence_rule;
pub mod stock_level;
