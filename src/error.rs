// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::loader::LoadError;
use crate::database::record::RecordError;
use crate::database::store::DatabaseError;
use crate::filter::FilterError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });
        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }
        response
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::SystemFieldNotAllowed(field) => {
                ApiError::bad_request(format!("System field '{}' cannot be set via API", field))
            }
            RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
            RecordError::EmptyChangeSet => ApiError::validation_error("No fields given to update", None),
            RecordError::MissingId => {
                tracing::error!("Row without id in data table");
                ApiError::internal_server_error("Stored record is malformed")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidTableName(msg) => {
                tracing::error!("Invalid table name in filter: {}", msg);
                ApiError::internal_server_error("Store is misconfigured")
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::conflict("A record with that id already exists, try again")
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_ascii_lowercase();
                if message.contains("no such column") || message.contains("has no column named") {
                    ApiError::bad_request(format!("Unknown column: {}", db_err.message()))
                } else if message.contains("locked") || message.contains("busy") {
                    ApiError::service_unavailable("Store is busy, try again")
                } else {
                    // Don't expose internal SQL errors to clients
                    tracing::error!("SQLite error: {}", err);
                    ApiError::internal_server_error("Database error occurred")
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            _ => {
                tracing::error!("SQLx error: {}", err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Filter(e) => e.into(),
            DatabaseError::Record(e) => e.into(),
            DatabaseError::Sqlx(e) => e.into(),
            DatabaseError::InvalidTimezone(zone) => {
                tracing::error!("Invalid audit time zone: {}", zone);
                ApiError::internal_server_error("Audit log is misconfigured")
            }
            DatabaseError::Io(e) => {
                tracing::error!("Store I/O error: {}", e);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Database(e) => e.into(),
            LoadError::Io(e) => {
                tracing::error!("CSV read failed: {}", e);
                ApiError::internal_server_error("Failed to read CSV")
            }
            malformed => ApiError::bad_request(malformed.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
