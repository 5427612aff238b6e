use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{bom, bom_checklist, bom_item},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{catalogue::PartNumberResolver, stock::MIN_QUANTITY},
};

pub const DUPLICATE_BOM_NAME: &str = "Bom with this Name already exists";
pub const DUPLICATE_BOM_PART: &str = "Part Number already exists in BOM";
pub const UNKNOWN_BOM_ITEM: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct BomName {
    #[validate(length(min = 1, max = 31))]
    pub name: String,
}

/// One row of a batch line-item edit.
///
/// Rows without an `id` are new items; `delete` drops an existing item (and
/// makes a new row a no-op).
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct BomItemEdit {
    pub id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 80))]
    pub part_number: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct BomItemsBatch {
    #[validate]
    pub items: Vec<BomItemEdit>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BomDetail {
    pub bom: bom::Model,
    pub items: Vec<bom_item::Model>,
    pub checklist: Vec<bom_checklist::Model>,
}

/// A batch row after part-number resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedEdit {
    pub id: Option<i32>,
    pub part_number: String,
    pub quantity: i32,
    pub delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemChange {
    Update {
        id: i32,
        part_number: String,
        quantity: i32,
    },
    /// An existing row whose part number changes. It is removed and written
    /// back under the same id, so parts can trade places within one batch.
    Move {
        id: i32,
        part_number: String,
        quantity: i32,
    },
    Insert {
        part_number: String,
        quantity: i32,
    },
    Delete {
        id: i32,
    },
}

/// Turns a batch into concrete changes, checking ids and the one-row-per-part
/// rule against the item set the batch would leave behind.
pub(crate) fn plan_item_changes(
    existing: &[bom_item::Model],
    edits: Vec<ResolvedEdit>,
) -> Result<Vec<ItemChange>, ServiceError> {
    let mut final_parts: HashMap<i32, String> = existing
        .iter()
        .map(|item| (item.id, item.part_number.clone()))
        .collect();
    let mut seen_ids = HashSet::new();
    let mut inserted = Vec::new();
    let mut changes = Vec::with_capacity(edits.len());

    for edit in edits {
        if let Some(id) = edit.id {
            if !final_parts.contains_key(&id) || !seen_ids.insert(id) {
                return Err(ServiceError::field("id", UNKNOWN_BOM_ITEM));
            }
        }

        match (edit.id, edit.delete) {
            (None, true) => continue,
            (Some(id), true) => {
                final_parts.remove(&id);
                changes.push(ItemChange::Delete { id });
                continue;
            }
            _ => {}
        }

        if edit.quantity < 1 {
            return Err(ServiceError::field("quantity", MIN_QUANTITY));
        }

        match edit.id {
            Some(id) => {
                let moved = final_parts.insert(id, edit.part_number.clone()).as_deref()
                    != Some(edit.part_number.as_str());
                changes.push(if moved {
                    ItemChange::Move {
                        id,
                        part_number: edit.part_number,
                        quantity: edit.quantity,
                    }
                } else {
                    ItemChange::Update {
                        id,
                        part_number: edit.part_number,
                        quantity: edit.quantity,
                    }
                });
            }
            None => {
                inserted.push(edit.part_number.clone());
                changes.push(ItemChange::Insert {
                    part_number: edit.part_number,
                    quantity: edit.quantity,
                });
            }
        }
    }

    let mut parts = HashSet::new();
    let duplicate = final_parts
        .values()
        .chain(inserted.iter())
        .any(|part| !parts.insert(part.as_str()));
    if duplicate {
        return Err(ServiceError::field("part_number", DUPLICATE_BOM_PART));
    }

    Ok(changes)
}

/// BOM headers and their line items
#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    parts: PartNumberResolver,
}

impl BomService {
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

    #[instrument(skip(self))]
    pub async fn create_bom(
        &self,
        name: &str,
        created_by: Option<String>,
    ) -> Result<bom::Model, ServiceError> {
        let name = clean_bom_name(name)?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        if name_taken(&txn, &name, None).await? {
            warn!("Rejected duplicate BOM name");
            return Err(ServiceError::field("name", DUPLICATE_BOM_NAME));
        }

        let created = bom::ActiveModel {
            name: Set(name),
            date_created: Set(Utc::now()),
            created_by: Set(created_by),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::on_unique_violation(e, "name", DUPLICATE_BOM_NAME))?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(bom_id = created.bom_id, name = %created.name, "BOM created");
        self.event_sender
            .send_or_log(Event::BomCreated {
                bom_id: created.bom_id,
                name: created.name.clone(),
            })
            .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn rename_bom(&self, bom_id: i32, name: &str) -> Result<bom::Model, ServiceError> {
        let name = clean_bom_name(name)?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let existing = find_bom(&txn, bom_id).await?;
        if name_taken(&txn, &name, Some(bom_id)).await? {
            return Err(ServiceError::field("name", DUPLICATE_BOM_NAME));
        }

        let mut active: bom::ActiveModel = existing.into();
        active.name = Set(name);
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::on_unique_violation(e, "name", DUPLICATE_BOM_NAME))?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(bom_id, "BOM renamed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_boms(&self) -> Result<Vec<bom::Model>, ServiceError> {
        bom::Entity::find()
            .order_by_asc(bom::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// The BOM with its items and current checklist.
    #[instrument(skip(self))]
    pub async fn get_bom(&self, bom_id: i32) -> Result<BomDetail, ServiceError> {
        let db = &*self.db;
        let bom = find_bom(db, bom_id).await?;
        let items = items_of(db, bom_id).await?;
        let checklist = bom_checklist::Entity::find()
            .filter(bom_checklist::Column::BomId.eq(bom_id))
            .order_by_asc(bom_checklist::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(BomDetail {
            bom,
            items,
            checklist,
        })
    }

    /// Deletes the BOM, its items and its checklist together.
    #[instrument(skip(self))]
    pub async fn delete_bom(&self, bom_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_bom(&txn, bom_id).await?;

        bom_checklist::Entity::delete_many()
            .filter(bom_checklist::Column::BomId.eq(bom_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        bom_item::Entity::delete_many()
            .filter(bom_item::Column::BomId.eq(bom_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        bom::Entity::delete_by_id(bom_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(|e| {
            error!("Failed to delete BOM: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(bom_id, "BOM deleted");
        self.event_sender.send_or_log(Event::BomDeleted(bom_id)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self, bom_id: i32) -> Result<Vec<bom_item::Model>, ServiceError> {
        let db = &*self.db;
        find_bom(db, bom_id).await?;
        items_of(db, bom_id).await
    }

    /// Applies a batch of line-item edits all-or-nothing.
    #[instrument(skip(self, batch), fields(rows = batch.items.len()))]
    pub async fn edit_items(
        &self,
        bom_id: i32,
        batch: BomItemsBatch,
        modified_by: Option<String>,
    ) -> Result<Vec<bom_item::Model>, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_bom(&txn, bom_id).await?;
        let existing = items_of(&txn, bom_id).await?;

        let mut resolved = Vec::with_capacity(batch.items.len());
        for edit in batch.items {
            let part_number = if edit.delete {
                edit.part_number
            } else {
                if edit.quantity < 1 {
                    return Err(ServiceError::field("quantity", MIN_QUANTITY));
                }
                self.parts.resolve(&txn, &edit.part_number).await?.part_number
            };
            resolved.push(ResolvedEdit {
                id: edit.id,
                part_number,
                quantity: edit.quantity,
                delete: edit.delete,
            });
        }

        let changes = plan_item_changes(&existing, resolved).map_err(|e| {
            warn!(error = %e, "Rejected BOM item batch");
            e
        })?;

        let now = Utc::now();
        // Rows leave first, then in-place updates, then every row that takes
        // a new part number. The final set is duplicate-free, so no step can
        // collide with a row the batch has yet to touch.
        for change in &changes {
            if let ItemChange::Delete { id } | ItemChange::Move { id, .. } = change {
                bom_item::Entity::delete_by_id(*id)
                    .exec(&txn)
                    .await
                    .map_err(ServiceError::db_error)?;
            }
        }

        for change in &changes {
            if let ItemChange::Update {
                id,
                part_number,
                quantity,
            } = change
            {
                bom_item::ActiveModel {
                    id: Set(*id),
                    bom_id: Set(bom_id),
                    part_number: Set(part_number.clone()),
                    quantity: Set(*quantity),
                    last_modified: Set(now),
                    modified_by: Set(modified_by.clone()),
                }
                .update(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            }
        }

        for change in changes {
            let row = match change {
                ItemChange::Move {
                    id,
                    part_number,
                    quantity,
                } => bom_item::ActiveModel {
                    id: Set(id),
                    bom_id: Set(bom_id),
                    part_number: Set(part_number),
                    quantity: Set(quantity),
                    last_modified: Set(now),
                    modified_by: Set(modified_by.clone()),
                },
                ItemChange::Insert {
                    part_number,
                    quantity,
                } => bom_item::ActiveModel {
                    bom_id: Set(bom_id),
                    part_number: Set(part_number),
                    quantity: Set(quantity),
                    last_modified: Set(now),
                    modified_by: Set(modified_by.clone()),
                    ..Default::default()
                },
                ItemChange::Delete { .. } | ItemChange::Update { .. } => continue,
            };
            row.insert(&txn).await.map_err(|e| {
                ServiceError::on_unique_violation(e, "part_number", DUPLICATE_BOM_PART)
            })?;
        }

        let items = items_of(&txn, bom_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(bom_id, items = items.len(), "BOM items updated");
        self.event_sender
            .send_or_log(Event::BomItemsUpdated {
                bom_id,
                item_count: items.len(),
            })
            .await;

        Ok(items)
    }
}

pub(crate) async fn find_bom<C: ConnectionTrait>(
    conn: &C,
    bom_id: i32,
) -> Result<bom::Model, ServiceError> {
    bom::Entity::find_by_id(bom_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Bom {} not found", bom_id)))
}

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    bom_id: i32,
) -> Result<Vec<bom_item::Model>, ServiceError> {
    bom_item::Entity::find()
        .filter(bom_item::Column::BomId.eq(bom_id))
        .order_by_asc(bom_item::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn name_taken<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    except: Option<i32>,
) -> Result<bool, ServiceError> {
    let mut query = bom::Entity::find().filter(bom::Column::Name.eq(name));
    if let Some(bom_id) = except {
        query = query.filter(bom::Column::BomId.ne(bom_id));
    }
    Ok(query
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .is_some())
}

fn clean_bom_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::field("name", "This field is required"));
    }
    if name.chars().count() > 31 {
        return Err(ServiceError::field(
            "name",
            "Ensure this value has at most 31 characters",
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn item(id: i32, part: &str) -> bom_item::Model {
        bom_item::Model {
            id,
            bom_id: 1,
            part_number: part.to_string(),
            quantity: 1,
            last_modified: Utc::now(),
            modified_by: None,
        }
    }

    fn edit(id: Option<i32>, part: &str, quantity: i32, delete: bool) -> ResolvedEdit {
        ResolvedEdit {
            id,
            part_number: part.to_string(),
            quantity,
            delete,
        }
    }

    fn assert_duplicate(result: Result<Vec<ItemChange>, ServiceError>) {
        assert_matches!(
            result,
            Err(ServiceError::FieldError { ref field, ref message })
                if field == "part_number" && message == DUPLICATE_BOM_PART
        );
    }

    #[test]
    fn two_new_rows_with_same_part_are_rejected() {
        assert_duplicate(plan_item_changes(
            &[],
            vec![
                edit(None, "1042033", 1, false),
                edit(None, "1042033", 2, false),
            ],
        ));
    }

    #[test]
    fn new_row_colliding_with_untouched_item_is_rejected() {
        assert_duplicate(plan_item_changes(
            &[item(10, "1042033")],
            vec![edit(None, "1042033", 4, false)],
        ));
    }

    #[test]
    fn part_can_move_from_deleted_row_to_new_row() {
        let changes = plan_item_changes(
            &[item(10, "1042033")],
            vec![
                edit(Some(10), "1042033", 1, true),
                edit(None, "1042033", 5, false),
            ],
        )
        .unwrap();
        assert_eq!(
            changes,
            vec![
                ItemChange::Delete { id: 10 },
                ItemChange::Insert {
                    part_number: "1042033".into(),
                    quantity: 5
                },
            ]
        );
    }

    #[test]
    fn blank_deleted_new_rows_are_ignored() {
        let changes = plan_item_changes(&[], vec![edit(None, "", 0, true)]).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn ids_must_belong_to_the_bom_and_appear_once() {
        let existing = [item(10, "1042033")];
        assert_matches!(
            plan_item_changes(&existing, vec![edit(Some(11), "1050710", 1, false)]),
            Err(ServiceError::FieldError { ref field, .. }) if field == "id"
        );
        assert_matches!(
            plan_item_changes(
                &existing,
                vec![
                    edit(Some(10), "1042033", 1, false),
                    edit(Some(10), "1050710", 1, false),
                ]
            ),
            Err(ServiceError::FieldError { ref field, .. }) if field == "id"
        );
    }

    #[test]
    fn kept_rows_need_positive_quantity() {
        assert_matches!(
            plan_item_changes(&[], vec![edit(None, "1042033", 0, false)]),
            Err(ServiceError::FieldError { ref field, .. }) if field == "quantity"
        );
    }

    #[test]
    fn updating_a_row_to_another_rows_part_is_rejected() {
        assert_duplicate(plan_item_changes(
            &[item(10, "1042033"), item(11, "1050710")],
            vec![edit(Some(11), "1042033", 2, false)],
        ));
    }

    #[test]
    fn swapped_parts_become_moves() {
        let changes = plan_item_changes(
            &[item(10, "1042033"), item(11, "1050710")],
            vec![
                edit(Some(10), "1050710", 1, false),
                edit(Some(11), "1042033", 3, false),
                edit(None, "6020481", 2, false),
            ],
        )
        .unwrap();
        assert_eq!(
            changes,
            vec![
                ItemChange::Move {
                    id: 10,
                    part_number: "1050710".into(),
                    quantity: 1
                },
                ItemChange::Move {
                    id: 11,
                    part_number: "1042033".into(),
                    quantity: 3
                },
                ItemChange::Insert {
                    part_number: "6020481".into(),
                    quantity: 2
                },
            ]
        );
    }

    #[test]
    fn quantity_only_edit_stays_an_update() {
        let changes =
            plan_item_changes(&[item(10, "1042033")], vec![edit(Some(10), "1042033", 7, false)])
                .unwrap();
        assert_eq!(
            changes,
            vec![ItemChange::Update {
                id: 10,
                part_number: "1042033".into(),
                quantity: 7
            }]
        );
    }

    #[test]
    fn bom_names_are_trimmed_and_bounded() {
        assert_eq!(clean_bom_name("  J&J Assembly Line ").unwrap(), "J&J Assembly Line");
        assert!(clean_bom_name("").is_err());
        assert!(clean_bom_name(&"x".repeat(32)).is_err());
    }
}
