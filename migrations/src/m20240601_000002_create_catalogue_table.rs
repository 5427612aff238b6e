use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_brands_table::Brands;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Catalogue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Catalogue::PartNumber)
                            .string_len(63)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Catalogue::BrandId).integer().not_null())
                    .col(ColumnDef::new(Catalogue::Category).string_len(64).null())
                    .col(ColumnDef::new(Catalogue::Description).string_len(255).null())
                    .col(
                        ColumnDef::new(Catalogue::VendorDescription)
                            .string_len(1023)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Catalogue::PurchaseUnitCostEur)
                            .decimal_len(10, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Catalogue::SaleUnitCostEur)
                            .decimal_len(10, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(Catalogue::Notes).string_len(1023).null())
                    .col(ColumnDef::new(Catalogue::Url).string_len(200).null())
                    .col(
                        ColumnDef::new(Catalogue::LastModified)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Catalogue::ModifiedBy).string_len(20).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogue_brand_id")
                            .from(Catalogue::Table, Catalogue::BrandId)
                            .to(Brands::Table, Brands::BrandId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalogue_brand_id")
                    .table(Catalogue::Table)
                    .col(Catalogue::BrandId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Catalogue::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Catalogue {
    Table,
    PartNumber,
    BrandId,
    Category,
    Description,
    VendorDescription,
    PurchaseUnitCostEur,
    SaleUnitCostEur,
    Notes,
    Url,
    LastModified,
    ModifiedBy,
}
