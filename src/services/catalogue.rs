use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    entities::{bom_checklist, bom_item, brand, catalogue, checked_out_stock, stock},
    errors::ServiceError,
};

pub const PART_NUMBER_REQUIRED: &str = "Part number is required";
pub const PART_NUMBER_NOT_IN_CATALOGUE: &str = "Part number not found in catalogue";
pub const DUPLICATE_CATALOGUE_ENTRY: &str = "Catalogue entry with this Part Number already exists";

/// Turns scanned or typed part numbers into catalogue keys.
///
/// Some vendor barcodes put a fixed prefix (`1P` on Siemens labels) in front
/// of the part number; it is stripped before lookup.
#[derive(Debug, Clone)]
pub struct PartNumberResolver {
    barcode_prefix: String,
}

impl PartNumberResolver {
    pub fn new(barcode_prefix: impl Into<String>) -> Self {
        Self {
            barcode_prefix: barcode_prefix.into(),
        }
    }

    fn strip_prefix<'a>(&self, value: &'a str) -> Option<&'a str> {
        let prefix_len = self.barcode_prefix.len();
        if prefix_len == 0 || value.len() <= prefix_len {
            return None;
        }
        value
            .get(..prefix_len)
            .filter(|head| head.eq_ignore_ascii_case(&self.barcode_prefix))
            .and_then(|_| value.get(prefix_len..))
            .map(str::trim_start)
            .filter(|rest| !rest.is_empty())
    }

    /// Trims input and strips the barcode prefix. Does not touch the database.
    pub fn normalize(&self, raw: &str) -> Result<String, ServiceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::field("part_number", PART_NUMBER_REQUIRED));
        }
        Ok(self.strip_prefix(trimmed).unwrap_or(trimmed).to_string())
    }

    /// Resolves `raw` to its catalogue entry.
    ///
    /// The prefix-stripped form wins; the untouched input is tried second so a
    /// part number that genuinely starts with the prefix still resolves.
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        conn: &C,
        raw: &str,
    ) -> Result<catalogue::Model, ServiceError> {
        let normalized = self.normalize(raw)?;
        if let Some(entry) = find_entry(conn, &normalized).await? {
            return Ok(entry);
        }

        let trimmed = raw.trim();
        if trimmed != normalized {
            if let Some(entry) = find_entry(conn, trimmed).await? {
                return Ok(entry);
            }
        }

        Err(ServiceError::field(
            "part_number",
            PART_NUMBER_NOT_IN_CATALOGUE,
        ))
    }
}

async fn find_entry<C: ConnectionTrait>(
    conn: &C,
    part_number: &str,
) -> Result<Option<catalogue::Model>, ServiceError> {
    catalogue::Entity::find_by_id(part_number.to_string())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

fn validate_cost(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::new(1, 2) {
        let mut err = ValidationError::new("min_cost");
        err.message = Some("Ensure this value is greater than or equal to 0.01".into());
        return Err(err);
    }
    if value.scale() > 2 || *value >= Decimal::new(100_000_000, 0) {
        let mut err = ValidationError::new("cost_precision");
        err.message = Some("Costs allow at most 8 integer digits and 2 decimal places".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct NewBrand {
    #[validate(length(min = 1, max = 31))]
    pub name: String,
}

/// Catalogue fields that can change after creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct CatalogueEntryFields {
    pub brand_id: i32,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(length(max = 1023))]
    pub vendor_description: Option<String>,
    #[validate(custom = "validate_cost")]
    #[schema(value_type = Option<String>, example = "122.40")]
    pub purchase_unit_cost_eur: Option<Decimal>,
    #[validate(custom = "validate_cost")]
    #[schema(value_type = Option<String>, example = "174.86")]
    pub sale_unit_cost_eur: Option<Decimal>,
    #[validate(length(max = 1023))]
    pub notes: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct NewCatalogueEntry {
    #[validate(length(min = 1, max = 63))]
    pub part_number: String,
    #[serde(flatten)]
    #[validate]
    pub fields: CatalogueEntryFields,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BrandDetail {
    pub brand: brand::Model,
    pub parts: Vec<catalogue::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogueEntryDetail {
    pub entry: catalogue::Model,
    pub brand: Option<brand::Model>,
    pub stock: Vec<stock::Model>,
    /// Sum of quantities across every location
    pub in_stock: i64,
}

/// Catalogue and brand management
#[derive(Clone)]
pub struct CatalogueService {
    db: Arc<DatabaseConnection>,
    parts: PartNumberResolver,
}

impl CatalogueService {
    pub fn new(db: Arc<DatabaseConnection>, parts: PartNumberResolver) -> Self {
        Self { db, parts }
    }

    #[instrument(skip(self))]
    pub async fn create_brand(&self, name: &str) -> Result<brand::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::field("name", "This field is required"));
        }

        let created = brand::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!("Failed to create brand: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(brand_id = created.brand_id, name = %created.name, "Brand created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_brands(&self) -> Result<Vec<brand::Model>, ServiceError> {
        brand::Entity::find()
            .order_by_asc(brand::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_brand(&self, brand_id: i32) -> Result<BrandDetail, ServiceError> {
        let db = &*self.db;
        let brand = brand::Entity::find_by_id(brand_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", brand_id)))?;

        let parts = catalogue::Entity::find()
            .filter(catalogue::Column::BrandId.eq(brand_id))
            .order_by_asc(catalogue::Column::PartNumber)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(BrandDetail { brand, parts })
    }

    async fn require_brand<C: ConnectionTrait>(
        conn: &C,
        brand_id: i32,
    ) -> Result<(), ServiceError> {
        brand::Entity::find_by_id(brand_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|_| ())
            .ok_or_else(|| ServiceError::field("brand_id", "Select a valid brand"))
    }

    #[instrument(skip(self, input), fields(part_number = %input.part_number))]
    pub async fn create_entry(
        &self,
        input: NewCatalogueEntry,
        modified_by: Option<String>,
    ) -> Result<catalogue::Model, ServiceError> {
        input.validate()?;
        let part_number = self.parts.normalize(&input.part_number)?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        if find_entry(&txn, &part_number).await?.is_some() {
            warn!("Rejected duplicate catalogue entry");
            return Err(ServiceError::field("part_number", DUPLICATE_CATALOGUE_ENTRY));
        }
        Self::require_brand(&txn, input.fields.brand_id).await?;

        let fields = input.fields;
        let created = catalogue::ActiveModel {
            part_number: Set(part_number),
            brand_id: Set(fields.brand_id),
            category: Set(fields.category),
            description: Set(fields.description),
            vendor_description: Set(fields.vendor_description),
            purchase_unit_cost_eur: Set(fields.purchase_unit_cost_eur),
            sale_unit_cost_eur: Set(fields.sale_unit_cost_eur),
            notes: Set(fields.notes),
            url: Set(fields.url),
            last_modified: Set(Utc::now()),
            modified_by: Set(modified_by),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::on_unique_violation(e, "part_number", DUPLICATE_CATALOGUE_ENTRY)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(part_number = %created.part_number, "Catalogue entry created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_entry(&self, part_number: &str) -> Result<CatalogueEntryDetail, ServiceError> {
        let db = &*self.db;
        let entry = find_entry(db, part_number).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Catalogue entry {} not found", part_number))
        })?;

        let brand = brand::Entity::find_by_id(entry.brand_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;

        let stock = stock::Entity::find()
            .filter(stock::Column::PartNumber.eq(entry.part_number.clone()))
            .order_by_asc(stock::Column::LocationId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let in_stock = stock.iter().map(|row| i64::from(row.quantity)).sum();

        Ok(CatalogueEntryDetail {
            entry,
            brand,
            stock,
            in_stock,
        })
    }

    /// Lists entries ordered by part number; `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_entries(
        &self,
        page: u64,
        per_page: u64,
        search: Option<&str>,
    ) -> Result<(Vec<catalogue::Model>, u64), ServiceError> {
        let mut query = catalogue::Entity::find().order_by_asc(catalogue::Column::PartNumber);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(catalogue::Column::PartNumber.contains(term))
                    .add(catalogue::Column::Description.contains(term))
                    .add(catalogue::Column::Category.contains(term)),
            );
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }

    /// Rewrites every editable field. The part number itself never changes.
    #[instrument(skip(self, fields))]
    pub async fn update_entry(
        &self,
        part_number: &str,
        fields: CatalogueEntryFields,
        modified_by: Option<String>,
    ) -> Result<catalogue::Model, ServiceError> {
        fields.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let existing = find_entry(&txn, part_number).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Catalogue entry {} not found", part_number))
        })?;
        Self::require_brand(&txn, fields.brand_id).await?;

        let mut entry: catalogue::ActiveModel = existing.into();
        entry.brand_id = Set(fields.brand_id);
        entry.category = Set(fields.category);
        entry.description = Set(fields.description);
        entry.vendor_description = Set(fields.vendor_description);
        entry.purchase_unit_cost_eur = Set(fields.purchase_unit_cost_eur);
        entry.sale_unit_cost_eur = Set(fields.sale_unit_cost_eur);
        entry.notes = Set(fields.notes);
        entry.url = Set(fields.url);
        entry.last_modified = Set(Utc::now());
        entry.modified_by = Set(modified_by);

        let updated = entry.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(part_number = %updated.part_number, "Catalogue entry updated");
        Ok(updated)
    }

    /// Deletes an entry nothing refers to.
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, part_number: &str) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        find_entry(&txn, part_number).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Catalogue entry {} not found", part_number))
        })?;

        let references = [
            count_references::<stock::Entity, _>(&txn, stock::Column::PartNumber, part_number)
                .await?,
            count_references::<checked_out_stock::Entity, _>(
                &txn,
                checked_out_stock::Column::PartNumber,
                part_number,
            )
            .await?,
            count_references::<bom_item::Entity, _>(&txn, bom_item::Column::PartNumber, part_number)
                .await?,
            count_references::<bom_checklist::Entity, _>(
                &txn,
                bom_checklist::Column::PartNumber,
                part_number,
            )
            .await?,
        ];

        if references.iter().any(|count| *count > 0) {
            warn!("Refused to delete referenced catalogue entry");
            return Err(ServiceError::Conflict(format!(
                "Catalogue entry {} is still referenced by stock, checkout history or a BOM",
                part_number
            )));
        }

        catalogue::Entity::delete_by_id(part_number.to_string())
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!("Catalogue entry deleted");
        Ok(())
    }
}

async fn count_references<E, C>(
    conn: &C,
    column: E::Column,
    part_number: &str,
) -> Result<u64, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    E::find()
        .filter(column.eq(part_number))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)
}
