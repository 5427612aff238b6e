use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::stock::{AddStock, CheckoutStock, StockFilter},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

/// Stock ledger and checked-out history routes
pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(list_stock).post(add_stock))
        .route("/stock/:id", get(get_stock).delete(delete_stock))
        .route("/stock/:id/checkout", post(checkout_stock))
        .route("/checked-out", get(list_checked_out))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockFilter),
    responses(
        (status = 200, description = "Stock rows, by part number then location", body = [crate::entities::stock::Model]),
        (status = 400, description = "Malformed part number filter", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .stock
        .list_stock(&filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rows))
}

/// Adds stock, merging into an existing row for the same part and location
#[utoipa::path(
    post,
    path = "/api/v1/stock",
    request_body = AddStock,
    responses(
        (status = 201, description = "Stock row created or merged", body = crate::entities::stock::Model),
        (status = 400, description = "Invalid quantity, unknown part or location", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddStock>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let row = state
        .services
        .stock
        .add_stock(payload, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;
    Ok(created_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/{id}",
    params(("id" = i32, Path, description = "Stock row id")),
    responses(
        (status = 200, description = "Stock row", body = crate::entities::stock::Model),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .services
        .stock
        .get_stock(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

/// Removes a whole stock row, keeping it in the checked-out history
#[utoipa::path(
    delete,
    path = "/api/v1/stock/{id}",
    params(("id" = i32, Path, description = "Stock row id")),
    responses(
        (status = 200, description = "Checked-out record of the removed row", body = crate::entities::checked_out_stock::Model),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn delete_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let checked_out = state
        .services
        .stock
        .delete_stock(id, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(checked_out))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock/{id}/checkout",
    params(("id" = i32, Path, description = "Stock row id")),
    request_body = CheckoutStock,
    responses(
        (status = 200, description = "Checked-out record and what is left of the row", body = crate::services::stock::CheckoutOutcome),
        (status = 400, description = "Quantity below 1", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn checkout_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
    Json(payload): Json<CheckoutStock>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let outcome = state
        .services
        .stock
        .checkout(
            id,
            payload.quantity,
            payload.comment,
            Some(user.audit_name()),
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/checked-out",
    params(StockFilter),
    responses(
        (status = 200, description = "Checked-out history, newest first", body = [crate::entities::checked_out_stock::Model])
    ),
    tag = "stock"
)]
pub async fn list_checked_out(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .stock
        .list_checked_out(&filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rows))
}
