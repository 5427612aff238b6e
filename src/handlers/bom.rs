use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{
        bom::{BomItemsBatch, BomName},
        checklist::ScanPart,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;

/// Creates the router for BOM endpoints, mounted at `/boms`
pub fn bom_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_boms).post(create_bom))
        .route("/:id", get(get_bom).put(rename_bom).delete(delete_bom))
        .route("/:id/items", get(list_bom_items).put(edit_bom_items))
        .route(
            "/:id/checklist",
            get(get_checklist).post(generate_checklist),
        )
        .route("/:id/checklist/scan", post(scan_part))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms",
    responses(
        (status = 200, description = "All BOMs ordered by name", body = [crate::entities::bom::Model])
    ),
    tag = "boms"
)]
pub async fn list_boms(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let boms = state
        .services
        .boms
        .list_boms()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(boms))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms",
    request_body = BomName,
    responses(
        (status = 201, description = "BOM created", body = crate::entities::bom::Model),
        (status = 400, description = "Invalid or duplicate name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn create_bom(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BomName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let bom = state
        .services
        .boms
        .create_bom(&payload.name, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;

    info!(bom_id = bom.bom_id, user = %user.username, "BOM created via API");
    Ok(created_response(bom))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 200, description = "BOM with its items and checklist", body = crate::services::bom::BomDetail),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn get_bom(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let bom = state
        .services
        .boms
        .get_bom(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(bom))
}

#[utoipa::path(
    put,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    request_body = BomName,
    responses(
        (status = 200, description = "BOM renamed", body = crate::entities::bom::Model),
        (status = 400, description = "Invalid or duplicate name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn rename_bom(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(payload): Json<BomName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let bom = state
        .services
        .boms
        .rename_bom(id, &payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(bom))
}

#[utoipa::path(
    delete,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 204, description = "BOM, its items and checklist deleted"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn delete_bom(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .boms
        .delete_bom(id)
        .await
        .map_err(map_service_error)?;

    info!(bom_id = id, user = %user.username, "BOM deleted via API");
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}/items",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 200, description = "Line items of the BOM", body = [crate::entities::bom_item::Model]),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    tag = "boms"
)]
pub async fn list_bom_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .boms
        .list_items(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

/// Applies a batch of line-item inserts, updates and deletes all-or-nothing
#[utoipa::path(
    put,
    path = "/api/v1/boms/{id}/items",
    params(("id" = i32, Path, description = "BOM id")),
    request_body = BomItemsBatch,
    responses(
        (status = 200, description = "Line items after the edit", body = [crate::entities::bom_item::Model]),
        (status = 400, description = "Duplicate part, unknown item, unknown part or bad quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn edit_bom_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
    Json(payload): Json<BomItemsBatch>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let items = state
        .services
        .boms
        .edit_items(id, payload, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}/checklist",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 200, description = "Checklist with on-hand totals", body = crate::services::checklist::ChecklistView),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    tag = "checklist"
)]
pub async fn get_checklist(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let checklist = state
        .services
        .checklist
        .get_checklist(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(checklist))
}

/// Rebuilds the checklist from the BOM's current items, discarding scan progress
#[utoipa::path(
    post,
    path = "/api/v1/boms/{id}/checklist",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 201, description = "Fresh checklist entries", body = [crate::entities::bom_checklist::Model]),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "checklist"
)]
pub async fn generate_checklist(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .checklist
        .generate(id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(entries))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms/{id}/checklist/scan",
    params(("id" = i32, Path, description = "BOM id")),
    request_body = ScanPart,
    responses(
        (status = 200, description = "Checklist entry after the scan", body = crate::entities::bom_checklist::Model),
        (status = 400, description = "Part not in the BOM or already fully scanned", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "BOM not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "checklist"
)]
pub async fn scan_part(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(payload): Json<ScanPart>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .checklist
        .scan(id, &payload.part_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}
