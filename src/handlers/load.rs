use axum::{body::Bytes, extract::State};
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/load - body is CSV text; replaces the data table
pub async fn post(State(state): State<AppState>, body: Bytes) -> ApiResult<Value> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body must contain CSV text"));
    }

    let rows = state.backend.loader().load_bytes(&body).await?;
    Ok(ApiResponse::success(json!({ "rows": rows })))
}
