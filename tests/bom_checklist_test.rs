mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, TEST_USER};
use serde_json::json;
use stockroom_api::{
    errors::ServiceError,
    services::{
        bom::{BomItemEdit, BomItemsBatch, DUPLICATE_BOM_NAME, DUPLICATE_BOM_PART},
        checklist::{ALREADY_SCANNED, PART_NOT_IN_BOM},
        stock::AddStock,
    },
};

fn new_item(part_number: &str, quantity: i32) -> BomItemEdit {
    BomItemEdit {
        id: None,
        part_number: part_number.to_string(),
        quantity,
        delete: false,
    }
}

fn batch(items: Vec<BomItemEdit>) -> BomItemsBatch {
    BomItemsBatch { items }
}

async fn bom_with_items(app: &TestApp, name: &str, items: &[(&str, i32)]) -> i32 {
    let boms = &app.services().boms;
    let bom = boms
        .create_bom(name, Some(TEST_USER.to_string()))
        .await
        .expect("create bom");
    boms.edit_items(
        bom.bom_id,
        batch(items.iter().map(|(p, q)| new_item(p, *q)).collect()),
        Some(TEST_USER.to_string()),
    )
    .await
    .expect("add items");
    bom.bom_id
}

fn remaining(entries: &[stockroom_api::entities::bom_checklist::Model]) -> Vec<i32> {
    entries.iter().map(|e| e.quantity_remaining).collect()
}

#[tokio::test]
async fn generating_snapshots_item_quantities() {
    let app = TestApp::new().await;
    for part in ["P1", "P2", "P3"] {
        app.seed_part(part).await;
    }
    let bom_id = bom_with_items(&app, "Danone Filtration System", &[("P1", 2), ("P2", 3)]).await;
    let checklist = &app.services().checklist;

    let entries = checklist.generate(bom_id).await.unwrap();
    assert_eq!(remaining(&entries), vec![2, 3]);

    checklist.scan(bom_id, "P1").await.unwrap();
    checklist.scan(bom_id, "P2").await.unwrap();

    app.services()
        .boms
        .edit_items(bom_id, batch(vec![new_item("P3", 1)]), None)
        .await
        .unwrap();

    // Item edits do not reach an existing checklist until it is regenerated.
    let view = checklist.get_checklist(bom_id).await.unwrap();
    assert_eq!(view.entries.len(), 2);

    let entries = checklist.generate(bom_id).await.unwrap();
    let parts: Vec<&str> = entries.iter().map(|e| e.part_number.as_str()).collect();
    assert_eq!(parts, vec!["P1", "P2", "P3"]);
    assert_eq!(remaining(&entries), vec![2, 3, 1]);
}

#[tokio::test]
async fn scanning_counts_down_and_stops_at_zero() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    let bom_id = bom_with_items(&app, "J&J Assembly Line", &[("P1", 2)]).await;
    let checklist = &app.services().checklist;
    checklist.generate(bom_id).await.unwrap();

    assert_eq!(checklist.scan(bom_id, "P1").await.unwrap().quantity_remaining, 1);
    assert_eq!(checklist.scan(bom_id, "P1").await.unwrap().quantity_remaining, 0);

    let err = checklist.scan(bom_id, "P1").await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::FieldError { ref message, .. } if message == ALREADY_SCANNED
    );

    let view = checklist.get_checklist(bom_id).await.unwrap();
    assert_eq!(view.entries[0].quantity_remaining, 0);
    assert!(view.complete);
}

#[tokio::test]
async fn scanning_an_unlisted_part_fails() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    app.seed_part("P2").await;
    let bom_id = bom_with_items(&app, "Line A", &[("P1", 1)]).await;
    let checklist = &app.services().checklist;
    checklist.generate(bom_id).await.unwrap();

    assert_matches!(
        checklist.scan(bom_id, "P2").await,
        Err(ServiceError::FieldError { ref message, .. }) if message == PART_NOT_IN_BOM
    );
    assert_eq!(
        checklist.get_checklist(bom_id).await.unwrap().entries[0].quantity_remaining,
        1
    );
}

#[tokio::test]
async fn scans_accept_the_barcode_prefix() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let bom_id = bom_with_items(&app, "Line A", &[("1042033", 2)]).await;
    let checklist = &app.services().checklist;
    checklist.generate(bom_id).await.unwrap();

    let entry = checklist.scan(bom_id, " 1P1042033 ").await.unwrap();
    assert_eq!(entry.part_number, "1042033");
    assert_eq!(entry.quantity_remaining, 1);
}

#[tokio::test]
async fn checklist_view_reports_stock_on_hand() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    app.seed_part("P2").await;
    let location = app.seed_location("Loc-01-01").await;
    app.services()
        .stock
        .add_stock(
            AddStock {
                part_number: "P1".to_string(),
                location_id: location.id,
                quantity: 7,
                comment: None,
            },
            None,
        )
        .await
        .unwrap();

    let bom_id = bom_with_items(&app, "Line A", &[("P1", 1), ("P2", 1)]).await;
    let checklist = &app.services().checklist;

    let empty = checklist.get_checklist(bom_id).await.unwrap();
    assert!(empty.entries.is_empty());
    assert!(!empty.complete);

    checklist.generate(bom_id).await.unwrap();
    let view = checklist.get_checklist(bom_id).await.unwrap();
    let in_stock: Vec<i64> = view.entries.iter().map(|e| e.in_stock).collect();
    assert_eq!(in_stock, vec![7, 0]);
    assert!(!view.complete);
}

#[tokio::test]
async fn duplicate_parts_in_one_batch_save_nothing() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    let boms = &app.services().boms;
    let bom = boms.create_bom("Line A", None).await.unwrap();

    let err = boms
        .edit_items(
            bom.bom_id,
            batch(vec![new_item("P1", 1), new_item("P1", 2)]),
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::FieldError { ref field, ref message }
            if field == "part_number" && message == DUPLICATE_BOM_PART
    );
    assert!(boms.list_items(bom.bom_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn adding_a_part_already_in_the_bom_is_rejected() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    let bom_id = bom_with_items(&app, "Line A", &[("P1", 1)]).await;

    assert_matches!(
        app.services()
            .boms
            .edit_items(bom_id, batch(vec![new_item("P1", 4)]), None)
            .await,
        Err(ServiceError::FieldError { ref message, .. }) if message == DUPLICATE_BOM_PART
    );
}

#[tokio::test]
async fn batch_updates_and_deletes_existing_items() {
    let app = TestApp::new().await;
    for part in ["P1", "P2", "P3"] {
        app.seed_part(part).await;
    }
    let bom_id = bom_with_items(&app, "Line A", &[("P1", 1), ("P2", 2)]).await;
    let boms = &app.services().boms;
    let items = boms.list_items(bom_id).await.unwrap();

    // P2's row is deleted and the part reappears on a new row in the same batch.
    let updated = boms
        .edit_items(
            bom_id,
            batch(vec![
                BomItemEdit {
                    id: Some(items[0].id),
                    part_number: "P3".to_string(),
                    quantity: 5,
                    delete: false,
                },
                BomItemEdit {
                    id: Some(items[1].id),
                    delete: true,
                    ..Default::default()
                },
                new_item("P2", 9),
            ]),
            Some(TEST_USER.to_string()),
        )
        .await
        .unwrap();

    let lines: Vec<(&str, i32)> = updated
        .iter()
        .map(|i| (i.part_number.as_str(), i.quantity))
        .collect();
    assert_eq!(lines, vec![("P3", 5), ("P2", 9)]);
    assert!(updated
        .iter()
        .all(|i| i.modified_by.as_deref() == Some(TEST_USER)));
}

#[tokio::test]
async fn new_row_may_take_a_part_an_updated_row_gives_up() {
    let app = TestApp::new().await;
    for part in ["P1", "P3"] {
        app.seed_part(part).await;
    }
    let bom_id = bom_with_items(&app, "Line B", &[("P1", 1)]).await;
    let boms = &app.services().boms;
    let items = boms.list_items(bom_id).await.unwrap();

    let updated = boms
        .edit_items(
            bom_id,
            batch(vec![
                new_item("P1", 4),
                BomItemEdit {
                    id: Some(items[0].id),
                    part_number: "P3".to_string(),
                    quantity: 2,
                    delete: false,
                },
            ]),
            None,
        )
        .await
        .unwrap();

    let lines: Vec<(i32, &str, i32)> = updated
        .iter()
        .map(|i| (i.id, i.part_number.as_str(), i.quantity))
        .collect();
    assert_eq!(lines[0], (items[0].id, "P3", 2));
    assert_eq!(lines[1].1, "P1");
    assert_eq!(lines[1].2, 4);
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn two_rows_can_swap_parts() {
    let app = TestApp::new().await;
    for part in ["P1", "P2"] {
        app.seed_part(part).await;
    }
    let bom_id = bom_with_items(&app, "Line C", &[("P1", 1), ("P2", 2)]).await;
    let boms = &app.services().boms;
    let items = boms.list_items(bom_id).await.unwrap();

    let updated = boms
        .edit_items(
            bom_id,
            batch(vec![
                BomItemEdit {
                    id: Some(items[0].id),
                    part_number: "P2".to_string(),
                    quantity: 1,
                    delete: false,
                },
                BomItemEdit {
                    id: Some(items[1].id),
                    part_number: "P1".to_string(),
                    quantity: 2,
                    delete: false,
                },
            ]),
            None,
        )
        .await
        .unwrap();

    let lines: Vec<(i32, &str, i32)> = updated
        .iter()
        .map(|i| (i.id, i.part_number.as_str(), i.quantity))
        .collect();
    assert_eq!(
        lines,
        vec![(items[0].id, "P2", 1), (items[1].id, "P1", 2)]
    );
}

#[tokio::test]
async fn bom_names_are_unique() {
    let app = TestApp::new().await;
    let boms = &app.services().boms;
    let first = boms.create_bom("Line A", None).await.unwrap();
    let second = boms.create_bom("Line B", None).await.unwrap();

    assert_matches!(
        boms.create_bom("Line A", None).await,
        Err(ServiceError::FieldError { ref message, .. }) if message == DUPLICATE_BOM_NAME
    );
    assert_matches!(
        boms.rename_bom(second.bom_id, "Line A").await,
        Err(ServiceError::FieldError { ref message, .. }) if message == DUPLICATE_BOM_NAME
    );

    // Renaming to its own name is not a conflict.
    let renamed = boms.rename_bom(first.bom_id, "Line A").await.unwrap();
    assert_eq!(renamed.name, "Line A");
}

#[tokio::test]
async fn deleting_a_bom_removes_items_and_checklist() {
    let app = TestApp::new().await;
    app.seed_part("P1").await;
    let bom_id = bom_with_items(&app, "Line A", &[("P1", 2)]).await;
    app.services().checklist.generate(bom_id).await.unwrap();

    app.services().boms.delete_bom(bom_id).await.unwrap();

    assert_matches!(
        app.services().boms.get_bom(bom_id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.services().boms.list_items(bom_id).await,
        Err(ServiceError::NotFound(_))
    );

    // With nothing referencing it any more, the part can leave the catalogue.
    app.services().catalogue.delete_entry("P1").await.unwrap();
}

#[tokio::test]
async fn checklist_workflow_over_http() {
    let app = TestApp::new().await;
    app.seed_part("1050710").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/boms",
            Some(json!({"name": "J&J Assembly Line"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["created_by"], TEST_USER);
    let bom_id = body["data"]["bom_id"].as_i64().unwrap();

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/boms/{}/items", bom_id),
            Some(json!({"items": [{"part_number": "1050710", "quantity": 3}]})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/boms/{}/checklist", bom_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/boms/{}/checklist", bom_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/boms/{}/checklist/scan", bom_id),
            Some(json!({"part_number": "1050711"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], PART_NOT_IN_BOM);
    assert_eq!(body["field"], "part_number");

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/boms/{}/checklist/scan", bom_id),
            Some(json!({"part_number": "1P1050710"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity_remaining"], 2);

    let response = app
        .request(Method::GET, &format!("/api/v1/boms/{}", bom_id), None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["checklist"][0]["quantity_remaining"], 2);

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/boms/{}", bom_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/boms/{}/checklist", bom_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
