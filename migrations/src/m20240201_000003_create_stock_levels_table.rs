use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockLevels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockLevels::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockLevels::WarehouseCode).string().not_null())
                    .col(ColumnDef::new(StockLevels::PartId).uuid().not_null())
                    .col(ColumnDef::new(StockLevels::LotId).uuid().null())
                    .col(
                        ColumnDef::new(StockLevels::Qty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockLevels::ReservedQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockLevels::AvailableQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockLevels::LastCountedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(StockLevels::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockLevels::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(StockLevels::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // One row per (org, warehouse, part, lot) coordinate.
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_levels_coordinate")
                    .table(StockLevels::Table)
                    .col(StockLevels::OrganizationId)
                    .col(StockLevels::WarehouseCode)
                    .col(StockLevels::PartId)
                    .col(StockLevels::LotId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockLevels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StockLevels {
    Table,
    Id,
    WarehouseCode,
    PartId,
    LotId,
    Qty,
    ReservedQty,
    AvailableQty,
    LastCountedAt,
    OrganizationId,
    CreatedAt,
    UpdatedAt,
}
