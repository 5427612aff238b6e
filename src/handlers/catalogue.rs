use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::catalogue::{CatalogueEntryFields, NewBrand, NewCatalogueEntry},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

/// Brand and part catalogue routes
pub fn catalogue_routes() -> Router<AppState> {
    Router::new()
        .route("/brands", get(list_brands).post(create_brand))
        .route("/brands/:id", get(get_brand))
        .route("/catalogue", get(list_entries).post(create_entry))
        .route(
            "/catalogue/:part_number",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/brands",
    responses(
        (status = 200, description = "All brands ordered by name", body = [crate::entities::brand::Model])
    ),
    tag = "catalogue"
)]
pub async fn list_brands(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let brands = state
        .services
        .catalogue
        .list_brands()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brands))
}

#[utoipa::path(
    post,
    path = "/api/v1/brands",
    request_body = NewBrand,
    responses(
        (status = 201, description = "Brand created", body = crate::entities::brand::Model),
        (status = 400, description = "Invalid or duplicate name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalogue"
)]
pub async fn create_brand(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<NewBrand>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let brand = state
        .services
        .catalogue
        .create_brand(&payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(brand))
}

#[utoipa::path(
    get,
    path = "/api/v1/brands/{id}",
    params(("id" = i32, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand with its catalogue entries", body = crate::services::catalogue::BrandDetail),
        (status = 404, description = "Brand not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogue"
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = state
        .services
        .catalogue
        .get_brand(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brand))
}

#[utoipa::path(
    get,
    path = "/api/v1/catalogue",
    params(PaginationParams),
    responses(
        (status = 200, description = "One page of catalogue entries", body = [crate::entities::catalogue::Model])
    ),
    tag = "catalogue"
)]
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(
        u64::from(state.config.api_default_page_size),
        u64::from(state.config.api_max_page_size),
    );
    let (entries, total) = state
        .services
        .catalogue
        .list_entries(page, per_page, params.search.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        entries, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/catalogue",
    request_body = NewCatalogueEntry,
    responses(
        (status = 201, description = "Catalogue entry created", body = crate::entities::catalogue::Model),
        (status = 400, description = "Invalid fields, unknown brand or duplicate part number", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalogue"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewCatalogueEntry>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .catalogue
        .create_entry(payload, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;
    Ok(created_response(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/catalogue/{part_number}",
    params(("part_number" = String, Path, description = "Part number")),
    responses(
        (status = 200, description = "Entry with brand, stock rows and on-hand total", body = crate::services::catalogue::CatalogueEntryDetail),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalogue"
)]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(part_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .services
        .catalogue
        .get_entry(&part_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}

#[utoipa::path(
    put,
    path = "/api/v1/catalogue/{part_number}",
    params(("part_number" = String, Path, description = "Part number")),
    request_body = CatalogueEntryFields,
    responses(
        (status = 200, description = "Entry updated", body = crate::entities::catalogue::Model),
        (status = 400, description = "Invalid fields or unknown brand", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalogue"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    Path(part_number): Path<String>,
    user: AuthUser,
    Json(payload): Json<CatalogueEntryFields>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .catalogue
        .update_entry(&part_number, payload, Some(user.audit_name()))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}

#[utoipa::path(
    delete,
    path = "/api/v1/catalogue/{part_number}",
    params(("part_number" = String, Path, description = "Part number")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Entry is still referenced by stock or BOMs", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalogue"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(part_number): Path<String>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalogue
        .delete_entry(&part_number)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
