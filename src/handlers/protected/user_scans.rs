// handlers/protected/user_scans.rs - Scan entries under /user-management

use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::validate::path_uuid;
use crate::api::{ApiJson, FieldErrors};
use crate::database::models::request::{is_valid_scan_status, UserScan, SCAN_STATUSES};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::protected::items::list::like_pattern;
use crate::handlers::protected::requests::SearchQuery;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct NewScanEntry {
    pub serial: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

fn check_status(errors: &mut FieldErrors, status: &str) {
    if !status.is_empty() && !is_valid_scan_status(status) {
        errors.add("status", format!("Status must be one of {}", SCAN_STATUSES.join(", ")));
    }
}

/// GET /user-management?q=
pub async fn list_get(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<UserScan>> {
    let pool = DatabaseManager::main_pool().await?;
    let pattern = query.q.as_deref().filter(|q| !q.trim().is_empty()).map(like_pattern);

    let scans = sqlx::query_as::<_, UserScan>(
        r#"
        SELECT * FROM user_scans
        WHERE org_id = $1 AND ($2::text IS NULL OR name ILIKE $2 OR serial ILIKE $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.org_id())
    .bind(pattern)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(scans))
}

/// POST /user-management
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<NewScanEntry>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let serial = errors.required("serial", body.serial.as_deref());
    let name = errors.required("name", body.name.as_deref());
    let date = errors.required("date", body.date.as_deref());
    let status = errors.required("status", body.status.as_deref());
    let icon = errors.required("icon", body.icon.as_deref());
    check_status(&mut errors, status);
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    let id: uuid::Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO user_scans (org_id, serial, name, date, status, icon)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING scan_entry_id
        "#,
    )
    .bind(user.org_id())
    .bind(serial)
    .bind(name)
    .bind(date)
    .bind(status)
    .bind(icon)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "id": id })).with_message("Scan entry created"))
}

/// PATCH /user-management/:id
pub async fn status_patch(
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let status = errors.required("status", body.status.as_deref());
    check_status(&mut errors, status);
    errors.finish()?;
    let id = path_uuid(&id, "Scan entry not found")?;

    let pool = DatabaseManager::main_pool().await?;
    let updated = sqlx::query(
        "UPDATE user_scans SET status = $1, updated_at = now() WHERE org_id = $2 AND scan_entry_id = $3",
    )
    .bind(status)
    .bind(user.org_id())
    .bind(id)
    .execute(&pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("Scan entry not found"));
    }

    Ok(ApiResponse::success(json!({ "id": id })).with_message("Status updated"))
}
