mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, TEST_USER};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use stockroom_api::{
    entities::stock,
    errors::ServiceError,
    services::stock::{
        AddStock, StockFilter, MAX_ADD_QUANTITY, MAX_QUANTITY, MIN_QUANTITY, STOCK_ROW_FULL,
    },
};

fn add(part_number: &str, location_id: i32, quantity: i32, comment: Option<&str>) -> AddStock {
    AddStock {
        part_number: part_number.to_string(),
        location_id,
        quantity,
        comment: comment.map(str::to_string),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn repeated_adds_merge_into_one_row(qty1 in 1i32..10_000, qty2 in 1i32..10_000) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let (rows, quantity) = rt.block_on(async {
            let app = TestApp::new().await;
            app.seed_part("1042033").await;
            let location = app.seed_location("Loc-01-01").await;
            let stock = &app.services().stock;

            stock.add_stock(add("1042033", location.id, qty1, None), None).await.expect("first add");
            let merged = stock.add_stock(add("1042033", location.id, qty2, None), None).await.expect("second add");

            let rows = stock.list_stock(&StockFilter::default()).await.expect("list");
            (rows.len(), merged.quantity)
        });

        prop_assert_eq!(rows, 1);
        prop_assert_eq!(quantity, qty1 + qty2);
    }
}

#[tokio::test]
async fn merge_keeps_the_original_comment_and_records_the_editor() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let stock = &app.services().stock;

    let first = stock
        .add_stock(add("1042033", location.id, 3, Some("Ships out 2024-01-01")), None)
        .await
        .unwrap();
    let merged = stock
        .add_stock(
            add("1042033", location.id, 2, Some("second delivery")),
            Some(TEST_USER.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(merged.stock_id, first.stock_id);
    assert_eq!(merged.quantity, 5);
    assert_eq!(merged.comment.as_deref(), Some("Ships out 2024-01-01"));
    assert_eq!(merged.modified_by.as_deref(), Some(TEST_USER));
}

#[tokio::test]
async fn same_part_at_two_locations_stays_two_rows() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let a = app.seed_location("Loc-01-01").await;
    let b = app.seed_location("Loc-01-02").await;
    let stock = &app.services().stock;

    stock.add_stock(add("1042033", a.id, 3, None), None).await.unwrap();
    stock.add_stock(add("1042033", b.id, 4, None), None).await.unwrap();

    let rows = stock.list_stock(&StockFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(stock.total_in_stock("1042033").await.unwrap(), 7);

    let at_b = stock
        .list_stock(&StockFilter {
            part_number: None,
            location_id: Some(b.id),
        })
        .await
        .unwrap();
    assert_eq!(at_b.len(), 1);
    assert_eq!(at_b[0].quantity, 4);
}

#[tokio::test]
async fn barcode_prefix_is_stripped_when_adding_stock() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;

    let row = app
        .services()
        .stock
        .add_stock(add("1P1042033", location.id, 1, None), None)
        .await
        .unwrap();
    assert_eq!(row.part_number, "1042033");
}

#[tokio::test]
async fn adding_unknown_part_or_location_is_rejected() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let stock = &app.services().stock;

    assert_matches!(
        stock.add_stock(add("9999999", location.id, 1, None), None).await,
        Err(ServiceError::FieldError { ref field, .. }) if field == "part_number"
    );
    assert_matches!(
        stock.add_stock(add("1042033", location.id + 100, 1, None), None).await,
        Err(ServiceError::FieldError { ref field, .. }) if field == "location_id"
    );
    assert!(stock.list_stock(&StockFilter::default()).await.unwrap().is_empty());
}

#[rstest]
#[case::partial(5, 2, Some(3), 2)]
#[case::exact(5, 5, None, 5)]
#[case::more_than_held(5, 9, None, 5)]
#[tokio::test]
async fn checkout_moves_quantity_into_history(
    #[case] held: i32,
    #[case] requested: i32,
    #[case] left: Option<i32>,
    #[case] recorded: i32,
) {
    let app = TestApp::new().await;
    app.seed_part("1050710").await;
    let location = app.seed_location("Loc-01-02").await;
    let stock = &app.services().stock;

    let row = stock
        .add_stock(add("1050710", location.id, held, Some("bench stock")), None)
        .await
        .unwrap();

    let outcome = stock
        .checkout(row.stock_id, requested, None, Some(TEST_USER.to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.remaining.as_ref().map(|r| r.quantity), left);
    assert_eq!(outcome.checked_out.quantity, recorded);
    assert_eq!(outcome.checked_out.part_number, "1050710");
    assert_eq!(outcome.checked_out.location_id, location.id);
    assert_eq!(outcome.checked_out.comment.as_deref(), Some("bench stock"));

    match left {
        Some(quantity) => assert_eq!(stock.get_stock(row.stock_id).await.unwrap().quantity, quantity),
        None => assert_matches!(
            stock.get_stock(row.stock_id).await,
            Err(ServiceError::NotFound(_))
        ),
    }
}

#[tokio::test]
async fn checkout_of_zero_changes_nothing() {
    let app = TestApp::new().await;
    app.seed_part("1050710").await;
    let location = app.seed_location("Loc-01-02").await;
    let stock = &app.services().stock;
    let row = stock
        .add_stock(add("1050710", location.id, 4, None), None)
        .await
        .unwrap();

    let err = stock.checkout(row.stock_id, 0, None, None).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::FieldError { ref field, ref message } if field == "quantity" && message == MIN_QUANTITY
    );

    assert_eq!(stock.get_stock(row.stock_id).await.unwrap().quantity, 4);
    assert!(stock
        .list_checked_out(&StockFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn checkout_comment_overrides_the_stock_comment() {
    let app = TestApp::new().await;
    app.seed_part("1050710").await;
    let location = app.seed_location("Loc-01-02").await;
    let stock = &app.services().stock;
    let row = stock
        .add_stock(add("1050710", location.id, 4, Some("spare")), None)
        .await
        .unwrap();

    let outcome = stock
        .checkout(row.stock_id, 1, Some("for J&J line".to_string()), None)
        .await
        .unwrap();
    assert_eq!(outcome.checked_out.comment.as_deref(), Some("for J&J line"));
}

#[tokio::test]
async fn delete_moves_the_whole_row_to_history() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let stock = &app.services().stock;
    let row = stock
        .add_stock(add("1042033", location.id, 3, Some("Ships out 2024-01-01")), None)
        .await
        .unwrap();

    let checked_out = stock
        .delete_stock(row.stock_id, Some(TEST_USER.to_string()))
        .await
        .unwrap();
    assert_eq!(checked_out.quantity, 3);
    assert_eq!(checked_out.comment.as_deref(), Some("Ships out 2024-01-01"));
    assert_eq!(checked_out.modified_by.as_deref(), Some(TEST_USER));

    assert_matches!(
        stock.get_stock(row.stock_id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        stock.delete_stock(row.stock_id, None).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn checked_out_history_is_newest_first() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let stock = &app.services().stock;
    let row = stock
        .add_stock(add("1042033", location.id, 10, None), None)
        .await
        .unwrap();

    let first = stock.checkout(row.stock_id, 1, None, None).await.unwrap();
    let second = stock.checkout(row.stock_id, 2, None, None).await.unwrap();

    let history = stock
        .list_checked_out(&StockFilter {
            part_number: Some("1042033".to_string()),
            location_id: None,
        })
        .await
        .unwrap();
    let ids: Vec<i32> = history.iter().map(|c| c.checked_out_id).collect();
    assert_eq!(
        ids,
        vec![
            second.checked_out.checked_out_id,
            first.checked_out.checked_out_id
        ]
    );
}

#[tokio::test]
async fn stock_routes_require_a_token_to_mutate() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let body = json!({"part_number": "1042033", "location_id": location.id, "quantity": 2});

    let response = app
        .request(Method::POST, "/api/v1/stock", Some(body.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::POST, "/api/v1/stock", Some(body), Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.request(Method::GET, "/api/v1/stock", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn stock_lifecycle_over_http() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/stock",
            Some(json!({"part_number": "1042033", "location_id": location.id, "quantity": 5})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["quantity"], 5);
    assert_eq!(body["data"]["modified_by"], TEST_USER);
    let stock_id = body["data"]["stock_id"].as_i64().unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/stock/{}/checkout", stock_id),
            Some(json!({"quantity": 0})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/stock/{}/checkout", stock_id),
            Some(json!({"quantity": 2, "comment": "line 3"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["checked_out"]["quantity"], 2);
    assert_eq!(body["data"]["remaining"]["quantity"], 3);

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/stock/{}", stock_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/stock/{}", stock_id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/v1/checked-out?part_number=1042033", None, None)
        .await;
    let body = response_json(response).await;
    let quantities: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![3, 2]);
}

#[tokio::test]
async fn invalid_quantities_name_the_field_over_http() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/stock",
            Some(json!({"part_number": "1042033", "location_id": location.id, "quantity": 0})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["field"], "quantity");
    assert_eq!(body["message"], MIN_QUANTITY);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/stock",
            Some(json!({
                "part_number": "1042033",
                "location_id": location.id,
                "quantity": MAX_ADD_QUANTITY + 1
            })),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["field"], "quantity");
    assert_eq!(body["message"], MAX_QUANTITY);

    let row = app
        .services()
        .stock
        .add_stock(add("1042033", location.id, 2, None), None)
        .await
        .unwrap();
    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/stock/{}/checkout", row.stock_id),
            Some(json!({"quantity": 0})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["field"], "quantity");
    assert_eq!(body["message"], MIN_QUANTITY);
}

#[tokio::test]
async fn adds_that_would_overflow_a_row_are_rejected() {
    let app = TestApp::new().await;
    app.seed_part("1042033").await;
    let location = app.seed_location("Loc-01-01").await;
    let ledger = &app.services().stock;

    assert_matches!(
        ledger
            .add_stock(add("1042033", location.id, MAX_ADD_QUANTITY + 1, None), None)
            .await,
        Err(ServiceError::FieldError { ref message, .. }) if message == MAX_QUANTITY
    );

    let row = ledger
        .add_stock(add("1042033", location.id, 1, None), None)
        .await
        .unwrap();
    let mut nearly_full: stock::ActiveModel = row.clone().into();
    nearly_full.quantity = Set(i32::MAX - 5);
    nearly_full.update(app.state.db.as_ref()).await.unwrap();

    assert_matches!(
        ledger.add_stock(add("1042033", location.id, 10, None), None).await,
        Err(ServiceError::FieldError { ref field, ref message })
            if field == "quantity" && message == STOCK_ROW_FULL
    );
    assert_eq!(
        ledger.get_stock(row.stock_id).await.unwrap().quantity,
        i32::MAX - 5
    );
}
