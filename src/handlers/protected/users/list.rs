use axum::{extract::Query, Extension};
use serde::Deserialize;

use crate::database::models::user::{UserListing, LISTING_SELECT};
use crate::database::DatabaseManager;
use crate::handlers::protected::items::list::like_pattern;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Members of `org_id` newest first, optionally matching `pattern`
pub async fn org_users(org_id: uuid::Uuid, pattern: Option<String>) -> Result<Vec<UserListing>, crate::error::ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let sql = format!(
        r#"{} WHERE u.org_id = $1
             AND ($2::text IS NULL OR u.full_name ILIKE $2 OR u.email ILIKE $2 OR u.department ILIKE $2)
           ORDER BY u.created_at DESC"#,
        LISTING_SELECT
    );
    Ok(sqlx::query_as::<_, UserListing>(&sql)
        .bind(org_id)
        .bind(pattern)
        .fetch_all(&pool)
        .await?)
}

/// GET /user
pub async fn get(Extension(user): Extension<ValidatedUser>) -> ApiResult<Vec<UserListing>> {
    Ok(ApiResponse::success(org_users(user.org_id(), None).await?))
}

/// GET /user/search?q= - over name, email and department
pub async fn search(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<UserListing>> {
    let pattern = query.q.as_deref().filter(|q| !q.trim().is_empty()).map(like_pattern);
    Ok(ApiResponse::success(org_users(user.org_id(), pattern).await?))
}
