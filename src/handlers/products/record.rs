use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Json,
};

use super::MutationResponse;
use crate::database::models::ProductPatch;
use crate::database::Record;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::MutationOutcome;

fn record_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Record id must be an integer"))
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("No product with id {}", id))
}

/// GET /api/products/:id
pub async fn get(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<Record> {
    let id = record_id(path)?;
    match state.backend.records().get(id).await? {
        Some(record) => Ok(ApiResponse::success(record)),
        None => Err(not_found(id)),
    }
}

/// PUT /api/products/:id - update from the edit form
pub async fn put(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let id = record_id(path)?;
    let Json(patch) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    patch
        .validate()
        .map_err(|errors| ApiError::validation_error("Invalid product", Some(errors)))?;

    let updated = state.backend.records().update(id, patch.into_fields()).await?;
    match updated.result {
        MutationOutcome::Applied => Ok(ApiResponse::success(MutationResponse::new(id, updated.audit))),
        MutationOutcome::NotFound => Err(not_found(id)),
    }
}

/// DELETE /api/products/:id
pub async fn delete(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<MutationResponse> {
    let id = record_id(path)?;
    let deleted = state.backend.records().delete(id).await?;
    match deleted.result {
        MutationOutcome::Applied => Ok(ApiResponse::success(MutationResponse::new(id, deleted.audit))),
        MutationOutcome::NotFound => Err(not_found(id)),
    }
}
