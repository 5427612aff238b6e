use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A part known to the stockroom, independent of how many are on hand.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "catalogue")]
#[schema(as = CatalogueEntry)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub part_number: String,
    pub brand_id: i32,
    pub category: Option<String>,
    pub description: Option<String>,
    pub vendor_description: Option<String>,
    /// Cost price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub purchase_unit_cost_eur: Option<Decimal>,
    /// Selling price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub sale_unit_cost_eur: Option<Decimal>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub modified_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::brand::Entity",
        from = "Column::BrandId",
        to = "super::brand::Column::BrandId"
    )]
    Brand,
    #[sea_orm(has_many = "super::stock::Entity")]
    Stock,
    #[sea_orm(has_many = "super::bom_item::Entity")]
    BomItems,
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl Related<super::stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stock.def()
    }
}

impl Related<super::bom_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
