use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{auth::AuthUser, errors::ApiError, services::locations::LocationName, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", get(get_location).put(rename_location))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    responses(
        (status = 200, description = "All locations ordered by name", body = [crate::entities::location::Model])
    ),
    tag = "locations"
)]
pub async fn list_locations(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let locations = state
        .services
        .locations
        .list_locations()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(locations))
}

#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = LocationName,
    responses(
        (status = 201, description = "Location created", body = crate::entities::location::Model),
        (status = 400, description = "Invalid name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<LocationName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let location = state
        .services
        .locations
        .create_location(&payload.location_name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(location))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = i32, Path, description = "Location id")),
    responses(
        (status = 200, description = "Location with the stock kept there", body = crate::services::locations::LocationDetail),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state
        .services
        .locations
        .get_location(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(location))
}

#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = i32, Path, description = "Location id")),
    request_body = LocationName,
    responses(
        (status = 200, description = "Location renamed", body = crate::entities::location::Model),
        (status = 400, description = "Invalid name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "locations"
)]
pub async fn rename_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    _user: AuthUser,
    Json(payload): Json<LocationName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let location = state
        .services
        .locations
        .rename_location(id, &payload.location_name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(location))
}
