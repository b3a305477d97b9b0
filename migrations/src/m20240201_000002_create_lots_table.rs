use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lots::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Lots::LotNumber).string().not_null())
                    .col(ColumnDef::new(Lots::PartId).uuid().not_null())
                    .col(
                        ColumnDef::new(Lots::InitialQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lots::CurrentQty)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Lots::Status).string().not_null())
                    .col(ColumnDef::new(Lots::InspectionStatus).string().not_null())
                    .col(ColumnDef::new(Lots::Vendor).string().null())
                    .col(ColumnDef::new(Lots::SupplierLotNumber).string().null())
                    .col(ColumnDef::new(Lots::OriginDate).date().null())
                    .col(ColumnDef::new(Lots::ExpiryDate).date().null())
                    .col(
                        ColumnDef::new(Lots::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Lots::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Lots::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lots_lot_number")
                    .table(Lots::Table)
                    .col(Lots::OrganizationId)
                    .col(Lots::LotNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lots_part_id")
                    .table(Lots::Table)
                    .col(Lots::PartId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Lots {
    Table,
    Id,
    LotNumber,
    PartId,
    InitialQty,
    CurrentQty,
    Status,
    InspectionStatus,
    Vendor,
    SupplierLotNumber,
    OriginDate,
    ExpiryDate,
    OrganizationId,
    CreatedAt,
    UpdatedAt,
}
