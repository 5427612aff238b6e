use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::{Alias, Expr, OnConflict},
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    entities::{checked_out_stock, location, stock},
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalogue::PartNumberResolver,
};

pub const MIN_QUANTITY: &str = "Ensure this value is greater than or equal to 1";
pub const MAX_QUANTITY: &str = "Ensure this value is less than or equal to 1000000";
pub const STOCK_ROW_FULL: &str = "Adding this quantity would exceed what one stock row can hold";

/// Largest quantity a single add may carry.
pub const MAX_ADD_QUANTITY: i32 = 1_000_000;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddStock {
    /// Part number as typed or scanned; a leading barcode prefix is accepted
    #[validate(length(min = 1, max = 80))]
    pub part_number: String,
    pub location_id: i32,
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i32,
    #[validate(length(max = 1023))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CheckoutStock {
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Stored on the checked-out record; defaults to the stock row's comment
    #[validate(length(max = 1023))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockFilter {
    pub part_number: Option<String>,
    pub location_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutOutcome {
    pub checked_out: checked_out_stock::Model,
    /// What is left of the stock row; absent when the row was used up
    pub remaining: Option<stock::Model>,
}

/// Quantity-on-hand ledger and its checked-out history
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    parts: PartNumberResolver,
}

impl StockService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        parts: PartNumberResolver,
    ) -> Self {
        Self {
            db,
            event_sender,
            parts,
        }
    }

    /// Adds `quantity` of a part at a location, merging into the existing row.
    #[instrument(skip(self, input), fields(part_number = %input.part_number, location_id = input.location_id))]
    pub async fn add_stock(
        &self,
        input: AddStock,
        modified_by: Option<String>,
    ) -> Result<stock::Model, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::field("quantity", MIN_QUANTITY));
        }
        if input.quantity > MAX_ADD_QUANTITY {
            return Err(ServiceError::field("quantity", MAX_QUANTITY));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let entry = self.parts.resolve(&txn, &input.part_number).await?;
        location::Entity::find_by_id(input.location_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::field("location_id", "Select a valid location"))?;

        let now = Utc::now();
        let merged = stock::Entity::update_many()
            .col_expr(
                stock::Column::Quantity,
                Expr::col(stock::Column::Quantity).add(input.quantity),
            )
            .col_expr(stock::Column::LastModified, Expr::value(now))
            .col_expr(stock::Column::ModifiedBy, Expr::value(modified_by.clone()))
            .filter(stock::Column::PartNumber.eq(entry.part_number.clone()))
            .filter(stock::Column::LocationId.eq(input.location_id))
            .filter(stock::Column::Quantity.lte(i32::MAX - input.quantity))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .rows_affected
            > 0;

        if !merged && find_row(&txn, &entry.part_number, input.location_id).await?.is_some() {
            warn!("Rejected add that would overflow the stock row");
            return Err(ServiceError::field("quantity", STOCK_ROW_FULL));
        }

        if !merged {
            // A concurrent add may have created the row since the update; the
            // conflict clause folds this insert into it.
            let new_row = stock::ActiveModel {
                part_number: Set(entry.part_number.clone()),
                location_id: Set(input.location_id),
                quantity: Set(input.quantity),
                comment: Set(input.comment.clone()),
                created: Set(now),
                last_modified: Set(now),
                modified_by: Set(modified_by.clone()),
                ..Default::default()
            };
            stock::Entity::insert(new_row)
                .on_conflict(
                    OnConflict::columns([stock::Column::PartNumber, stock::Column::LocationId])
                        .value(
                            stock::Column::Quantity,
                            Expr::col((stock::Entity, stock::Column::Quantity)).add(Expr::col((
                                Alias::new("excluded"),
                                stock::Column::Quantity,
                            ))),
                        )
                        .update_columns([stock::Column::LastModified, stock::Column::ModifiedBy])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        }

        let row = find_row(&txn, &entry.part_number, input.location_id)
            .await?
            .ok_or_else(|| ServiceError::InternalError("stock row vanished after add".into()))?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("stockroom_stock_added_units", input.quantity as u64);
        info!(stock_id = row.stock_id, quantity = row.quantity, merged, "Stock added");

        self.event_sender
            .send_or_log(Event::StockAdded {
                stock_id: row.stock_id,
                part_number: row.part_number.clone(),
                location_id: row.location_id,
                quantity: input.quantity,
                merged,
            })
            .await;

        Ok(row)
    }

    /// Moves `quantity` units of a stock row into the checked-out ledger.
    ///
    /// Asking for at least what the row holds checks out the whole row and
    /// removes it; the history then records the row's actual quantity.
    #[instrument(skip(self, comment))]
    pub async fn checkout(
        &self,
        stock_id: i32,
        quantity: i32,
        comment: Option<String>,
        modified_by: Option<String>,
    ) -> Result<CheckoutOutcome, ServiceError> {
        if quantity < 1 {
            warn!("Rejected checkout of non-positive quantity");
            return Err(ServiceError::field("quantity", MIN_QUANTITY));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let row = find_locked(&txn, stock_id).await?;
        let now = Utc::now();

        let (moved, remaining) = if quantity >= row.quantity {
            stock::Entity::delete_by_id(row.stock_id)
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            (row.quantity, None)
        } else {
            let mut active: stock::ActiveModel = row.clone().into();
            active.quantity = Set(row.quantity - quantity);
            active.last_modified = Set(now);
            active.modified_by = Set(modified_by.clone());
            let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
            (quantity, Some(updated))
        };

        let checked_out = record_checkout(
            &txn,
            &row,
            moved,
            comment.or_else(|| row.comment.clone()),
            modified_by,
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("stockroom_stock_checked_out_units", moved as u64);
        let left = remaining.as_ref().map_or(0, |r| r.quantity);
        info!(
            checked_out_id = checked_out.checked_out_id,
            moved,
            remaining = left,
            "Stock checked out"
        );

        self.event_sender
            .send_or_log(Event::StockCheckedOut {
                stock_id,
                checked_out_id: checked_out.checked_out_id,
                part_number: checked_out.part_number.clone(),
                quantity: moved,
                remaining: left,
            })
            .await;

        Ok(CheckoutOutcome {
            checked_out,
            remaining,
        })
    }

    /// Manual removal: the whole row goes to the checked-out ledger.
    #[instrument(skip(self))]
    pub async fn delete_stock(
        &self,
        stock_id: i32,
        modified_by: Option<String>,
    ) -> Result<checked_out_stock::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let row = find_locked(&txn, stock_id).await?;

        let checked_out =
            record_checkout(&txn, &row, row.quantity, row.comment.clone(), modified_by).await?;
        stock::Entity::delete_by_id(row.stock_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("stockroom_stock_removed_units", row.quantity as u64);
        info!(quantity = row.quantity, "Stock row removed");

        self.event_sender
            .send_or_log(Event::StockRemoved {
                stock_id,
                checked_out_id: checked_out.checked_out_id,
                part_number: row.part_number,
                quantity: row.quantity,
            })
            .await;

        Ok(checked_out)
    }

    #[instrument(skip(self))]
    pub async fn get_stock(&self, stock_id: i32) -> Result<stock::Model, ServiceError> {
        stock::Entity::find_by_id(stock_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock {} not found", stock_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_stock(&self, filter: &StockFilter) -> Result<Vec<stock::Model>, ServiceError> {
        let mut query = stock::Entity::find()
            .order_by_asc(stock::Column::PartNumber)
            .order_by_asc(stock::Column::LocationId);

        if let Some(part_number) = self.filter_part_number(filter)? {
            query = query.filter(stock::Column::PartNumber.eq(part_number));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(stock::Column::LocationId.eq(location_id));
        }

        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Checked-out history, newest first.
    #[instrument(skip(self))]
    pub async fn list_checked_out(
        &self,
        filter: &StockFilter,
    ) -> Result<Vec<checked_out_stock::Model>, ServiceError> {
        let mut query = checked_out_stock::Entity::find()
            .order_by_desc(checked_out_stock::Column::LastModified)
            .order_by_desc(checked_out_stock::Column::CheckedOutId);

        if let Some(part_number) = self.filter_part_number(filter)? {
            query = query.filter(checked_out_stock::Column::PartNumber.eq(part_number));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(checked_out_stock::Column::LocationId.eq(location_id));
        }

        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Quantity of a part on hand across all locations.
    #[instrument(skip(self))]
    pub async fn total_in_stock(&self, part_number: &str) -> Result<i64, ServiceError> {
        let part_number = self.parts.normalize(part_number)?;
        let totals = in_stock_totals(&*self.db, vec![part_number.clone()]).await?;
        Ok(totals.get(&part_number).copied().unwrap_or(0))
    }

    fn filter_part_number(&self, filter: &StockFilter) -> Result<Option<String>, ServiceError> {
        filter
            .part_number
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| self.parts.normalize(p))
            .transpose()
    }
}

async fn find_row<C: ConnectionTrait>(
    conn: &C,
    part_number: &str,
    location_id: i32,
) -> Result<Option<stock::Model>, ServiceError> {
    stock::Entity::find()
        .filter(stock::Column::PartNumber.eq(part_number))
        .filter(stock::Column::LocationId.eq(location_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// On-hand totals for each of `part_numbers`; parts with no stock are absent.
pub async fn in_stock_totals<C: ConnectionTrait>(
    conn: &C,
    part_numbers: Vec<String>,
) -> Result<HashMap<String, i64>, ServiceError> {
    if part_numbers.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, i32)> = stock::Entity::find()
        .select_only()
        .column(stock::Column::PartNumber)
        .column(stock::Column::Quantity)
        .filter(stock::Column::PartNumber.is_in(part_numbers))
        .into_tuple()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut totals = HashMap::new();
    for (part_number, quantity) in rows {
        *totals.entry(part_number).or_insert(0) += i64::from(quantity);
    }
    Ok(totals)
}

async fn find_locked<C: ConnectionTrait>(
    conn: &C,
    stock_id: i32,
) -> Result<stock::Model, ServiceError> {
    stock::Entity::find_by_id(stock_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Stock {} not found", stock_id)))
}

async fn record_checkout<C: ConnectionTrait>(
    conn: &C,
    row: &stock::Model,
    quantity: i32,
    comment: Option<String>,
    modified_by: Option<String>,
) -> Result<checked_out_stock::Model, ServiceError> {
    checked_out_stock::ActiveModel {
        part_number: Set(row.part_number.clone()),
        location_id: Set(row.location_id),
        quantity: Set(quantity),
        comment: Set(comment),
        last_modified: Set(Utc::now()),
        modified_by: Set(modified_by),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}
