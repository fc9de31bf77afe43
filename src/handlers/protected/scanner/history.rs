use axum::{extract::Query, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, FieldErrors};
use crate::config::CONFIG;
use crate::database::models::ScanHistory;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct NewScan {
    pub serial_id: Option<String>,
    pub item_name: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Requested page size, defaulted and capped by the filter config
pub fn history_limit(requested: Option<i64>) -> Result<i64, ApiError> {
    let limit = requested.unwrap_or(CONFIG.filter.default_limit);
    if limit < 1 {
        return Err(ApiError::bad_request("'limit' must be a positive integer"));
    }
    Ok(CONFIG.filter.max_limit.map_or(limit, |max| limit.min(max)))
}

/// POST /scanner/history - record a scan event
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<NewScan>,
) -> ApiResult<ScanHistory> {
    let mut errors = FieldErrors::new();
    let serial_id = errors.required("serial_id", body.serial_id.as_deref());
    let item_name = errors.required("item_name", body.item_name.as_deref());
    let status = errors.required("status", body.status.as_deref());
    errors.max_len("status", Some(status), 50);
    let scanned_by = errors.uuid("user_id", body.user_id.as_deref()).unwrap_or(user.user_id());
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    let scan = sqlx::query_as::<_, ScanHistory>(
        r#"
        INSERT INTO scan_history (org_id, user_id, item_id, item_name, serial_id, status)
        VALUES ($1, $2, (SELECT item_id FROM items WHERE org_id = $1 AND serial_id = $3), $4, $3, $5)
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(scanned_by)
    .bind(serial_id)
    .bind(item_name)
    .bind(status)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(scan))
}

/// GET /scanner/history?user_id=&limit= - newest first
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<ScanHistory>> {
    let limit = history_limit(query.limit)?;
    let pool = DatabaseManager::main_pool().await?;

    let history = sqlx::query_as::<_, ScanHistory>(
        r#"
        SELECT * FROM scan_history
        WHERE org_id = $1 AND ($2::uuid IS NULL OR user_id = $2)
        ORDER BY scanned_at DESC
        LIMIT $3
        "#,
    )
    .bind(user.org_id())
    .bind(query.user_id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(history))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit() {
        assert_eq!(history_limit(None).unwrap(), CONFIG.filter.default_limit);
        assert_eq!(history_limit(Some(5)).unwrap(), 5);
        assert!(history_limit(Some(0)).is_err());
        if let Some(max) = CONFIG.filter.max_limit {
            assert_eq!(history_limit(Some(max + 1)).unwrap(), max);
        }
    }
}
