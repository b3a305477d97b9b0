use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CountAudits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CountAudits::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CountAudits::WarehouseCode).string().not_null())
                    .col(ColumnDef::new(CountAudits::PartId).uuid().not_null())
                    .col(ColumnDef::new(CountAudits::LotId).uuid().null())
                    .col(
                        ColumnDef::new(CountAudits::BeforeQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CountAudits::CountedQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CountAudits::DiffQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CountAudits::Reason).string().not_null())
                    .col(ColumnDef::new(CountAudits::LedgerEntryId).uuid().null())
                    .col(ColumnDef::new(CountAudits::CountedBy).string().not_null())
                    .col(
                        ColumnDef::new(CountAudits::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CountAudits::CountedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_count_audits_coordinate")
                    .table(CountAudits::Table)
                    .col(CountAudits::WarehouseCode)
                    .col(CountAudits::PartId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CountAudits::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CountAudits {
    Table,
    Id,
    WarehouseCode,
    PartId,
    LotId,
    BeforeQty,
    CountedQty,
    DiffQty,
    Reason,
    LedgerEntryId,
    CountedBy,
    OrganizationId,
    CountedAt,
}
