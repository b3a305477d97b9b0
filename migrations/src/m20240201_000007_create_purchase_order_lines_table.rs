use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::PoNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::LineNo)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::PartId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::OrderedQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::ReceivedQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::Status).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_order_lines_po")
                    .table(PurchaseOrderLines::Table)
                    .col(PurchaseOrderLines::PoNumber)
                    .col(PurchaseOrderLines::LineNo)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseOrderLines::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PurchaseOrderLines {
    Table,
    Id,
    PoNumber,
    LineNo,
    PartId,
    OrderedQty,
    ReceivedQty,
    Status,
    OrganizationId,
    CreatedAt,
    UpdatedAt,
}
