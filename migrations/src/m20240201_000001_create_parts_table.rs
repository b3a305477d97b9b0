use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Parts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Parts::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Parts::PartNumber).string().not_null())
                    .col(ColumnDef::new(Parts::Description).string().null())
                    .col(ColumnDef::new(Parts::Splittable).boolean().not_null())
                    .col(ColumnDef::new(Parts::LotTracked).boolean().not_null())
                    .col(
                        ColumnDef::new(Parts::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Parts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Parts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parts_part_number")
                    .table(Parts::Table)
                    .col(Parts::OrganizationId)
                    .col(Parts::PartNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Parts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Parts {
    Table,
    Id,
    PartNumber,
    Description,
    Splittable,
    LotTracked,
    OrganizationId,
    CreatedAt,
    UpdatedAt,
}
