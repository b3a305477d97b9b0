use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SequenceRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SequenceRules::Id)
                            .integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SequenceRules::RuleType).string().not_null())
                    .col(ColumnDef::new(SequenceRules::Pattern).string().not_null())
                    .col(ColumnDef::new(SequenceRules::Prefix).string().null())
                    .col(ColumnDef::new(SequenceRules::Suffix).string().null())
                    .col(
                        ColumnDef::new(SequenceRules::SequenceLength)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SequenceRules::CurrentSequence)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SequenceRules::ResetPolicy).string().not_null())
                    .col(ColumnDef::new(SequenceRules::LastResetAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(SequenceRules::Active).boolean().not_null())
                    .col(ColumnDef::new(SequenceRules::UpdatedBy).string().null())
                    .col(ColumnDef::new(SequenceRules::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SequenceRules::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sequence_rules_rule_type")
                    .table(SequenceRules::Table)
                    .col(SequenceRules::RuleType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SequenceRules::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SequenceRules {
    Table,
    Id,
    RuleType,
    Pattern,
    Prefix,
    Suffix,
    SequenceLength,
    CurrentSequence,
    ResetPolicy,
    LastResetAt,
    Active,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
