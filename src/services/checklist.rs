use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{bom, bom_checklist, bom_item},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{bom::find_bom, catalogue::PartNumberResolver, stock::in_stock_totals},
};

pub const PART_NOT_IN_BOM: &str = "Part number not found in BOM";
pub const ALREADY_SCANNED: &str = "All required items of this P/N have already been scanned";

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ScanPart {
    /// Part number as scanned, barcode prefix included
    #[validate(length(min = 1, max = 80))]
    pub part_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChecklistLine {
    pub id: i32,
    pub part_number: String,
    pub quantity_remaining: i32,
    /// Units of the part on hand across all locations
    pub in_stock: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChecklistView {
    pub bom_id: i32,
    pub entries: Vec<ChecklistLine>,
    /// Every entry has been scanned down to zero
    pub complete: bool,
}

/// Generate/scan workflow over a BOM's checklist.
///
/// A checklist is a snapshot of the BOM's items taken at generation time;
/// later item edits do not reach it until it is regenerated.
#[derive(Clone)]
pub struct ChecklistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    parts: PartNumberResolver,
}

impl ChecklistService {
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

    /// Replaces the BOM's checklist with one fresh entry per current item.
    /// Scan progress is discarded.
    #[instrument(skip(self))]
    pub async fn generate(&self, bom_id: i32) -> Result<Vec<bom_checklist::Model>, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        // Serializes concurrent regenerations of the same BOM.
        bom::Entity::find_by_id(bom_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Bom {} not found", bom_id)))?;

        bom_checklist::Entity::delete_many()
            .filter(bom_checklist::Column::BomId.eq(bom_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let items = bom_item::Entity::find()
            .filter(bom_item::Column::BomId.eq(bom_id))
            .order_by_asc(bom_item::Column::Id)
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        if !items.is_empty() {
            let rows = items.into_iter().map(|item| bom_checklist::ActiveModel {
                bom_id: Set(bom_id),
                part_number: Set(item.part_number),
                quantity_remaining: Set(item.quantity),
                ..Default::default()
            });
            bom_checklist::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        }

        let entries = entries_of(&txn, bom_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(bom_id, entries = entries.len(), "Checklist generated");
        self.event_sender
            .send_or_log(Event::ChecklistGenerated {
                bom_id,
                entries: entries.len(),
            })
            .await;

        Ok(entries)
    }

    /// Records one scanned unit of a part against the BOM's checklist.
    #[instrument(skip(self))]
    pub async fn scan(
        &self,
        bom_id: i32,
        raw_part_number: &str,
    ) -> Result<bom_checklist::Model, ServiceError> {
        let normalized = self.parts.normalize(raw_part_number)?;
        let mut candidates = vec![normalized.clone()];
        let trimmed = raw_part_number.trim();
        if trimmed != normalized {
            candidates.push(trimmed.to_string());
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_bom(&txn, bom_id).await?;

        let matches = bom_checklist::Entity::find()
            .filter(bom_checklist::Column::BomId.eq(bom_id))
            .filter(bom_checklist::Column::PartNumber.is_in(candidates))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let entry = matches
            .iter()
            .find(|entry| entry.part_number == normalized)
            .or_else(|| matches.first())
            .cloned()
            .ok_or_else(|| {
                warn!("Scanned part is not on the checklist");
                ServiceError::field("part_number", PART_NOT_IN_BOM)
            })?;

        let decremented = bom_checklist::Entity::update_many()
            .col_expr(
                bom_checklist::Column::QuantityRemaining,
                Expr::col(bom_checklist::Column::QuantityRemaining).sub(1),
            )
            .filter(bom_checklist::Column::Id.eq(entry.id))
            .filter(bom_checklist::Column::QuantityRemaining.gt(0))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .rows_affected;

        let current = bom_checklist::Entity::find_by_id(entry.id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let updated = match (decremented, current) {
            (0, None) => {
                warn!("Checklist entry vanished during scan");
                return Err(ServiceError::field("part_number", PART_NOT_IN_BOM));
            }
            (0, Some(_)) => {
                warn!(part_number = %entry.part_number, "Rejected scan of fully scanned part");
                return Err(ServiceError::field("part_number", ALREADY_SCANNED));
            }
            (_, Some(updated)) => updated,
            (_, None) => {
                return Err(ServiceError::InternalError(
                    "checklist entry missing after decrement".into(),
                ))
            }
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("stockroom_checklist_scans", 1);
        info!(
            part_number = %updated.part_number,
            quantity_remaining = updated.quantity_remaining,
            "Part scanned"
        );
        self.event_sender
            .send_or_log(Event::PartScanned {
                bom_id,
                part_number: updated.part_number.clone(),
                quantity_remaining: updated.quantity_remaining,
            })
            .await;

        Ok(updated)
    }

    /// Current checklist with on-hand totals for each part.
    #[instrument(skip(self))]
    pub async fn get_checklist(&self, bom_id: i32) -> Result<ChecklistView, ServiceError> {
        let db = &*self.db;
        find_bom(db, bom_id).await?;

        let entries = entries_of(db, bom_id).await?;
        let totals = in_stock_totals(
            db,
            entries.iter().map(|e| e.part_number.clone()).collect(),
        )
        .await?;

        let lines: Vec<ChecklistLine> = entries
            .into_iter()
            .map(|entry| ChecklistLine {
                in_stock: totals.get(&entry.part_number).copied().unwrap_or(0),
                id: entry.id,
                part_number: entry.part_number,
                quantity_remaining: entry.quantity_remaining,
            })
            .collect();

        Ok(ChecklistView {
            bom_id,
            complete: is_complete(&lines),
            entries: lines,
        })
    }
}

/// An empty checklist (never generated, or generated from an empty BOM) is not complete.
fn is_complete(lines: &[ChecklistLine]) -> bool {
    !lines.is_empty() && lines.iter().all(|line| line.quantity_remaining <= 0)
}

async fn entries_of<C: sea_orm::ConnectionTrait>(
    conn: &C,
    bom_id: i32,
) -> Result<Vec<bom_checklist::Model>, ServiceError> {
    bom_checklist::Entity::find()
        .filter(bom_checklist::Column::BomId.eq(bom_id))
        .order_by_asc(bom_checklist::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}
