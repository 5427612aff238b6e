use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "brands")]
#[schema(as = Brand)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub brand_id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::catalogue::Entity")]
    Catalogue,
}

impl Related<super::catalogue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalogue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
