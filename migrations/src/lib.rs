pub use sea_orm_migration::prelude::*;

mod m20240201_000001_create_parts_table;
mod m20240201_000002_create_lots_table;
mod m20240201_000003_create_stock_levels_table;
mod m20240201_000004_create_ledger_entries_table;
mod m20240201_000005_create_sequence_rules_table;
mod m20240201_000006_create_count_audits_table;
mod m20240201_000007_create_purchase_order_lines_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_parts_table::Migration),
            Box::new(m20240201_000002_create_lots_table::Migration),
            Box::new(m20240201_000003_create_stock_levels_table::Migration),
            Box::new(m20240201_000004_create_ledger_entries_table::Migration),
            Box::new(m20240201_000005_create_sequence_rules_table::Migration),
            Box::new(m20240201_000006_create_count_audits_table::Migration),
            Box::new(m20240201_000007_create_purchase_order_lines_table::Migration),
        ]
    }
}
