use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only record of stock taken out of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "checked_out_stock")]
#[schema(as = CheckedOutStock)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub checked_out_id: i32,
    pub part_number: String,
    pub location_id: i32,
    pub quantity: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub modified_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalogue::Entity",
        from = "Column::PartNumber",
        to = "super::catalogue::Column::PartNumber"
    )]
    Catalogue,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
}

impl Related<super::catalogue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalogue.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
