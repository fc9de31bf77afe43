use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::Value;

use super::listing_json;
use crate::database::models::item::{ItemListing, LISTING_SELECT};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

/// `%term%` for ILIKE, with the pattern characters escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// GET /items?search= - the organization's items, newest first
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Value>> {
    let pool = DatabaseManager::main_pool().await?;
    let pattern = query
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(like_pattern);

    let sql = format!(
        r#"{} WHERE i.org_id = $1
             AND ($2::text IS NULL
                  OR i.item_name ILIKE $2 OR i.description ILIKE $2 OR i.serial_id ILIKE $2)
           ORDER BY i.created_at DESC"#,
        LISTING_SELECT
    );
    let items = sqlx::query_as::<_, ItemListing>(&sql)
        .bind(user.org_id())
        .bind(pattern)
        .fetch_all(&pool)
        .await?;

    Ok(ApiResponse::success(items.iter().map(listing_json).collect()))
}

/// GET /items/scan/:code - look an item up by serial, or by id when the code is a UUID
pub async fn scan(
    Extension(user): Extension<ValidatedUser>,
    Path(code): Path<String>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::main_pool().await?;
    let item = ItemListing::find_by_code(&pool, user.org_id(), &code)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(ApiResponse::success(listing_json(&item)))
}
