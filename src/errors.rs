use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "All required items of this P/N have already been scanned",
    "field": "part_number",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Input field the error is attached to, for field-level validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "part_number")]
    pub field: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub(crate) fn build(status: StatusCode, message: String, field: Option<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            field,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Validation failure attached to one input field.
    #[error("{field}: {message}")]
    FieldError { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        match first_field_error(&err) {
            Some((field, message)) => ServiceError::FieldError { field, message },
            None => ServiceError::ValidationError(err.to_string()),
        }
    }
}

/// Picks the alphabetically first failing field, descending into nested
/// structs and lists, and renders its first failure as a sentence.
fn first_field_error(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| **name);

    fields.into_iter().find_map(|(name, kind)| match kind {
        ValidationErrorsKind::Field(failures) => failures
            .first()
            .map(|failure| (name.to_string(), describe_failure(failure))),
        ValidationErrorsKind::Struct(inner) => first_field_error(inner),
        ValidationErrorsKind::List(rows) => rows.values().find_map(|row| first_field_error(row)),
    })
}

fn describe_failure(failure: &ValidationError) -> String {
    if let Some(message) = &failure.message {
        return message.to_string();
    }

    let param = |key: &str| failure.params.get(key).and_then(|v| v.as_f64());
    match failure.code.as_ref() {
        "range" => match (param("value"), param("min"), param("max")) {
            (Some(value), Some(min), _) if value < min => {
                format!("Ensure this value is greater than or equal to {}", min)
            }
            (_, _, Some(max)) => format!("Ensure this value is less than or equal to {}", max),
            _ => "Enter a valid number.".to_string(),
        },
        "length" => {
            let len = failure
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.chars().count() as f64);
            match (len, param("min"), param("max")) {
                (Some(len), Some(_), _) if len == 0.0 => "This field is required".to_string(),
                (Some(len), Some(min), _) if len < min => {
                    format!("Ensure this value has at least {} characters", min)
                }
                (_, _, Some(max)) => format!("Ensure this value has at most {} characters", max),
                _ => "Enter a valid value.".to_string(),
            }
        }
        "url" => "Enter a valid URL.".to_string(),
        _ => "Enter a valid value.".to_string(),
    }
}

impl ServiceError {
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Maps a unique-constraint violation onto a field error, leaving every
    /// other database failure as is.
    pub fn on_unique_violation(err: DbErr, field: &str, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::field(field, message),
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::FieldError { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::FieldError { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }

    /// Name of the offending input field, if any.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::FieldError { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse::build(
            status,
            self.response_message(),
            self.field_name().map(str::to_string),
        );

        (status, Json(err)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use validator::Validate;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(payload.field.is_none());
    }

    #[tokio::test]
    async fn field_error_reports_field_and_bare_message() {
        let response =
            ServiceError::field("part_number", "Part number not found in BOM").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.field.as_deref(), Some("part_number"));
        assert_eq!(payload.message, "Part number not found in BOM");
        assert_eq!(payload.error, "Bad Request");
    }

    #[derive(Validate)]
    struct Checkout {
        #[validate(range(min = 1, max = 1_000_000))]
        quantity: i32,
        #[validate(length(max = 4))]
        comment: String,
    }

    #[test]
    fn validator_failures_become_field_errors() {
        let err = ServiceError::from(
            Checkout {
                quantity: 0,
                comment: "ok".into(),
            }
            .validate()
            .unwrap_err(),
        );
        assert_matches::assert_matches!(
            err,
            ServiceError::FieldError { ref field, ref message }
                if field == "quantity"
                    && message == "Ensure this value is greater than or equal to 1"
        );

        let err = ServiceError::from(
            Checkout {
                quantity: 2_000_000,
                comment: "too long".into(),
            }
            .validate()
            .unwrap_err(),
        );
        assert_eq!(err.field_name(), Some("comment"));
        assert_eq!(
            err.response_message(),
            "Ensure this value has at most 4 characters"
        );
    }

    #[tokio::test]
    async fn api_error_delegates_to_the_service_error() {
        let response = ApiError::from(ServiceError::field("quantity", "bad")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.field.as_deref(), Some("quantity"));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::field("name", "x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::db_error(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::db_error(DbErr::Custom("relation \"stock\" does not exist".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::NotFound("Bom 4 not found".into()).response_message(),
            "Not found: Bom 4 not found"
        );
    }

    #[test]
    fn non_unique_db_errors_pass_through() {
        let err = ServiceError::on_unique_violation(
            DbErr::Custom("connection reset".into()),
            "name",
            "Bom with this Name already exists",
        );
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
