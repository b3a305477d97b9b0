use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::TransactionNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::FromWarehouse).string().null())
                    .col(ColumnDef::new(LedgerEntries::ToWarehouse).string().null())
                    .col(ColumnDef::new(LedgerEntries::PartId).uuid().not_null())
                    .col(ColumnDef::new(LedgerEntries::LotId).uuid().null())
                    .col(
                        ColumnDef::new(LedgerEntries::Qty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::ReferenceType).string().null())
                    .col(ColumnDef::new(LedgerEntries::ReferenceId).uuid().null())
                    .col(
                        ColumnDef::new(LedgerEntries::CancelReferenceId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Status).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Reason).string().null())
                    .col(ColumnDef::new(LedgerEntries::Notes).text().null())
                    .col(ColumnDef::new(LedgerEntries::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_transaction_number")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::TransactionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_part_lot")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::PartId)
                    .col(LedgerEntries::LotId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_cancel_reference")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::CancelReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    TransactionNumber,
    TransactionType,
    TransactionDate,
    FromWarehouse,
    ToWarehouse,
    PartId,
    LotId,
    Qty,
    ReferenceType,
    ReferenceId,
    CancelReferenceId,
    Status,
    Reason,
    Notes,
    CreatedBy,
    OrganizationId,
    CreatedAt,
}
