use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::MutationResponse;
use crate::database::models::{ProductForm, Visibility, VISIBILITY_COLUMN};
use crate::database::Record;
use crate::error::ApiError;
use crate::filter::{FilterData, FilterOp};
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Substring of the title column
    pub title: Option<String>,
    /// High / Medium / Low, or All
    pub visibility: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/products - list with the search form's two predicates
pub async fn get(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Record>> {
    let records = state.backend.records();
    let mut filter = records.filter()?;

    if let Some(title) = query.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter.condition(records.title_column(), FilterOp::Contains, title);
    }
    let visibility = Visibility::from_selector(query.visibility.as_deref()).map_err(ApiError::bad_request)?;
    if let Some(visibility) = visibility {
        filter.condition(VISIBILITY_COLUMN, FilterOp::Eq, visibility.as_str());
    }
    if let Some(limit) = query.limit {
        filter.limit(limit)?;
    }

    Ok(ApiResponse::success(records.list(filter).await?))
}

/// POST /api/products/find - list with a JSON filter body
pub async fn find(
    State(state): State<AppState>,
    payload: Result<Json<FilterData>, JsonRejection>,
) -> ApiResult<Vec<Record>> {
    let Json(filter_data) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    Ok(ApiResponse::success(state.backend.records().find(filter_data).await?))
}

/// POST /api/products - create from the add form
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<ProductForm>, JsonRejection>,
) -> ApiResult<MutationResponse> {
    let Json(form) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    form.validate()
        .map_err(|errors| ApiError::validation_error("Invalid product", Some(errors)))?;

    let created = state.backend.records().create(form.into_fields()).await?;
    Ok(ApiResponse::created(MutationResponse::new(created.result, created.audit)))
}
