// handlers/protected/requests.rs - Borrow requests under /requests

use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::validate::path_uuid;
use crate::api::{ApiJson, FieldErrors};
use crate::database::models::request::{is_valid_request_status, BorrowRequest, REQUEST_STATUSES};
use crate::database::models::role::MANAGE_ORDERS;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::protected::items::list::like_pattern;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewRequest {
    pub serial: Option<String>,
    pub name: Option<String>,
    pub requester: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

/// GET /requests?q=
pub async fn list_get(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<BorrowRequest>> {
    let pool = DatabaseManager::main_pool().await?;
    let pattern = query.q.as_deref().filter(|q| !q.trim().is_empty()).map(like_pattern);

    let requests = sqlx::query_as::<_, BorrowRequest>(
        r#"
        SELECT * FROM requests
        WHERE org_id = $1
          AND ($2::text IS NULL OR name ILIKE $2 OR serial ILIKE $2 OR requester ILIKE $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.org_id())
    .bind(pattern)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(requests))
}

/// POST /requests
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<NewRequest>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let serial = errors.required("serial", body.serial.as_deref());
    let name = errors.required("name", body.name.as_deref());
    let requester = errors.required("requester", body.requester.as_deref());
    let date = errors.required("date", body.date.as_deref());
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    let id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO requests (org_id, serial, name, requester, date) VALUES ($1, $2, $3, $4, $5) RETURNING request_id",
    )
    .bind(user.org_id())
    .bind(serial)
    .bind(name)
    .bind(requester)
    .bind(date)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "id": id })).with_message("Request created"))
}

/// PATCH /requests/:id - approve, decline or clear
pub async fn status_patch(
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Value> {
    user.require(MANAGE_ORDERS)?;
    if !is_valid_request_status(body.status.as_deref()) {
        return Err(ApiError::field_error(
            "status",
            format!("Status must be one of {} or null", REQUEST_STATUSES.join(", ")),
        ));
    }
    let id = path_uuid(&id, "Request not found")?;

    let pool = DatabaseManager::main_pool().await?;
    let updated = sqlx::query("UPDATE requests SET status = $1, updated_at = now() WHERE org_id = $2 AND request_id = $3")
        .bind(&body.status)
        .bind(user.org_id())
        .bind(id)
        .execute(&pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Request not found"));
    }

    tracing::info!("Request {} set to {:?} by {}", id, body.status, user.user_id());
    Ok(ApiResponse::success(json!({ "id": id })).with_message("Status updated"))
}
