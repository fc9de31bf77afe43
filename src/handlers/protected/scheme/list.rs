use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::scheme::{list as listing, search};

type Row = Map<String, Value>;

#[derive(Debug, Deserialize)]
pub struct MultiQuery {
    pub models: Option<String>,
    pub limit: Option<i64>,
}

/// GET /scheme/list/:model?page=&limit=&order=&<field>=<value>
pub async fn list(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Row>> {
    let repo = repository(&model, &user).await?;
    let page = listing::list(&repo, &params).await?;
    Ok(ApiResponse::success(page.data).with_meta(page.meta))
}

/// GET /scheme/list-multi?models=a,b&limit=
pub async fn list_multi(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<MultiQuery>,
) -> ApiResult<BTreeMap<String, Vec<Row>>> {
    let raw = query
        .models
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Query parameter 'models' is required"))?;
    let models = listing::parse_models(raw);
    Ok(ApiResponse::success(listing::list_multi(user.org_id(), &models, query.limit).await?))
}

/// GET /scheme/fuse-search/:model?q=&keys=&limit=&threshold=
pub async fn fuse_search(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<search::SearchHit>> {
    let repo = repository(&model, &user).await?;
    let hits = search::fuse_search(&repo, &params).await?;
    let count = hits.len();
    Ok(ApiResponse::success(hits).with_meta(serde_json::json!({ "count": count })))
}
