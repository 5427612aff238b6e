use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{location, stock},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LocationName {
    #[validate(length(min = 1, max = 63))]
    pub location_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationDetail {
    pub location: location::Model,
    pub stock: Vec<stock::Model>,
}

/// Named places stock is kept. Names need not be unique.
#[derive(Clone)]
pub struct LocationService {
    db: Arc<DatabaseConnection>,
}

impl LocationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_location(&self, name: &str) -> Result<location::Model, ServiceError> {
        let created = location::ActiveModel {
            location_name: Set(clean_name(name)?),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(location_id = created.id, "Location created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn rename_location(
        &self,
        location_id: i32,
        name: &str,
    ) -> Result<location::Model, ServiceError> {
        let name = clean_name(name)?;
        let existing = self.find(location_id).await?;

        let mut active: location::ActiveModel = existing.into();
        active.location_name = Set(name);
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(location_id, "Location renamed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> Result<Vec<location::Model>, ServiceError> {
        location::Entity::find()
            .order_by_asc(location::Column::LocationName)
            .order_by_asc(location::Column::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// The location together with every stock row held there.
    #[instrument(skip(self))]
    pub async fn get_location(&self, location_id: i32) -> Result<LocationDetail, ServiceError> {
        let location = self.find(location_id).await?;
        let stock = stock::Entity::find()
            .filter(stock::Column::LocationId.eq(location_id))
            .order_by_asc(stock::Column::PartNumber)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(LocationDetail { location, stock })
    }

    async fn find(&self, location_id: i32) -> Result<location::Model, ServiceError> {
        location::Entity::find_by_id(location_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))
    }
}

fn clean_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::field("location_name", "This field is required"));
    }
    if name.chars().count() > 63 {
        return Err(ServiceError::field(
            "location_name",
            "Ensure this value has at most 63 characters",
        ));
    }
    Ok(name.to_string())
}
