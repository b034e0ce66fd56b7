use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use crate::database::OperationLogEntry;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct OperationsQuery {
    pub limit: Option<i64>,
}

/// GET /api/operations - newest log entries first
pub async fn get(State(state): State<AppState>, Query(query): Query<OperationsQuery>) -> ApiResult<Vec<OperationLogEntry>> {
    let entries = state.backend.operations(query.limit).await?;
    Ok(ApiResponse::success(entries))
}
