use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Scan-off progress for one part of a BOM. Rows are replaced wholesale on regeneration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bom_checklist")]
#[schema(as = BomChecklistEntry)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bom_id: i32,
    pub part_number: String,
    pub quantity_remaining: i32,
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
