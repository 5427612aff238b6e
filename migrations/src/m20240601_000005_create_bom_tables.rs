use sea_orm_migration::prelude::*;

use super::m20240601_000002_create_catalogue_table::Catalogue;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Boms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Boms::BomId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Boms::Name)
                            .string_len(31)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Boms::DateCreated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Boms::CreatedBy).string_len(20).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BomItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BomItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BomItems::BomId).integer().not_null())
                    .col(
                        ColumnDef::new(BomItems::PartNumber)
                            .string_len(63)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BomItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(BomItems::LastModified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(BomItems::ModifiedBy).string_len(20).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_items_bom_id")
                            .from(BomItems::Table, BomItems::BomId)
                            .to(Boms::Table, Boms::BomId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_items_part_number")
                            .from(BomItems::Table, BomItems::PartNumber)
                            .to(Catalogue::Table, Catalogue::PartNumber)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bom_items_bom_part")
                    .table(BomItems::Table)
                    .col(BomItems::BomId)
                    .col(BomItems::PartNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BomChecklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BomChecklist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BomChecklist::BomId).integer().not_null())
                    .col(
                        ColumnDef::new(BomChecklist::PartNumber)
                            .string_len(63)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BomChecklist::QuantityRemaining)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_checklist_bom_id")
                            .from(BomChecklist::Table, BomChecklist::BomId)
                            .to(Boms::Table, Boms::BomId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_checklist_part_number")
                            .from(BomChecklist::Table, BomChecklist::PartNumber)
                            .to(Catalogue::Table, Catalogue::PartNumber)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bom_checklist_bom_part")
                    .table(BomChecklist::Table)
                    .col(BomChecklist::BomId)
                    .col(BomChecklist::PartNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BomChecklist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BomItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Boms {
    Table,
    BomId,
    Name,
    DateCreated,
    CreatedBy,
}

#[derive(DeriveIden)]
pub enum BomItems {
    Table,
    Id,
    BomId,
    PartNumber,
    Quantity,
    LastModified,
    ModifiedBy,
}

#[derive(DeriveIden)]
pub enum BomChecklist {
    Table,
    Id,
    BomId,
    PartNumber,
    QuantityRemaining,
}
