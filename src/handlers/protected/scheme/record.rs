use axum::{
    extract::{Path, Query},
    Extension,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{repository, writable_repository};
use crate::api::ApiJson;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::scheme::crud;

type Row = Map<String, Value>;

/// POST /scheme/:model
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Row> {
    let repo = writable_repository(&model, &user).await?;
    let row = crud::create(&repo, &body).await?;
    tracing::info!("{} record created in {}", model, user.org_id());
    Ok(ApiResponse::created(row))
}

/// GET /scheme/:model?id=
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Row> {
    let repo = repository(&model, &user).await?;
    let id = params
        .get("id")
        .map(String::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'id' is required"))?;
    Ok(ApiResponse::success(crud::read(&repo, id).await?))
}

/// PATCH /scheme/:model - body carries the primary key
pub async fn patch(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Row> {
    let repo = writable_repository(&model, &user).await?;
    Ok(ApiResponse::success(crud::patch(&repo, &body).await?))
}

/// PUT /scheme/:model - full replacement
pub async fn put(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Row> {
    let repo = writable_repository(&model, &user).await?;
    Ok(ApiResponse::success(crud::update(&repo, &body).await?))
}
