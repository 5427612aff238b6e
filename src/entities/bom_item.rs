use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One (part, required quantity) line of a BOM. Unique per (bom_id, part_number).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bom_items")]
#[schema(as = BomItem)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bom_id: i32,
    pub part_number: String,
    pub quantity: i32,
    pub last_modified: DateTime<Utc>,
    pub modified_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bom::Entity",
        from = "Column::BomId",
        to = "super::bom::Column::BomId"
    )]
    Bom,
    #[sea_orm(
        belongs_to = "super::catalogue::Entity",
        from = "Column::PartNumber",
        to = "super::catalogue::Column::PartNumber"
    )]
    Catalogue,
}

impl Related<super::bom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bom.def()
    }
}

impl Related<super::catalogue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalogue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
