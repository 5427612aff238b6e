use sea_orm_migration::prelude::*;

use super::m20240601_000002_create_catalogue_table::Catalogue;
use super::m20240601_000003_create_locations_table::Locations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stock::StockId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stock::PartNumber).string_len(63).not_null())
                    .col(ColumnDef::new(Stock::LocationId).integer().not_null())
                    .col(ColumnDef::new(Stock::Quantity).integer().not_null())
                    .col(ColumnDef::new(Stock::Comment).text().null())
                    .col(
                        ColumnDef::new(Stock::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Stock::LastModified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Stock::ModifiedBy).string_len(20).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_part_number")
                            .from(Stock::Table, Stock::PartNumber)
                            .to(Catalogue::Table, Catalogue::PartNumber)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_location_id")
                            .from(Stock::Table, Stock::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::NoAction)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // One logical stock row per (part, location); re-adds merge into it.
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_part_location")
                    .table(Stock::Table)
                    .col(Stock::PartNumber)
                    .col(Stock::LocationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CheckedOutStock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckedOutStock::CheckedOutId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CheckedOutStock::PartNumber)
                            .string_len(63)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckedOutStock::LocationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CheckedOutStock::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CheckedOutStock::Comment).text().null())
                    .col(
                        ColumnDef::new(CheckedOutStock::LastModified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CheckedOutStock::ModifiedBy)
                            .string_len(20)
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checked_out_stock_part_number")
                            .from(CheckedOutStock::Table, CheckedOutStock::PartNumber)
                            .to(Catalogue::Table, Catalogue::PartNumber)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checked_out_stock_location_id")
                            .from(CheckedOutStock::Table, CheckedOutStock::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::NoAction)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_checked_out_stock_part_number")
                    .table(CheckedOutStock::Table)
                    .col(CheckedOutStock::PartNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckedOutStock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stock::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Stock {
    Table,
    StockId,
    PartNumber,
    LocationId,
    Quantity,
    Comment,
    Created,
    LastModified,
    ModifiedBy,
}

#[derive(DeriveIden)]
pub enum CheckedOutStock {
    Table,
    CheckedOutId,
    PartNumber,
    LocationId,
    Quantity,
    Comment,
    LastModified,
    ModifiedBy,
}
