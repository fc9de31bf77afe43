//! Borrow and return. Each runs in one transaction with the item row locked.

use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::validate::present;
use crate::api::{ApiJson, FieldErrors};
use crate::database::models::{Item, ItemReturn, ScanHistory};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::protected::items::input::{STATUS_AVAILABLE, STATUS_BORROWED};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub item_id: Option<String>,
    pub condition_on_return: Option<String>,
    pub reason: Option<String>,
}

fn required_item_id(errors: &mut FieldErrors, raw: Option<&str>) -> Option<Uuid> {
    if present(raw).is_none() {
        errors.add("item_id", crate::api::validate::REQUIRED);
        return None;
    }
    errors.uuid("item_id", raw)
}

/// POST /scanner/borrow
pub async fn borrow_post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<BorrowRequest>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let item_id = required_item_id(&mut errors, body.item_id.as_deref());
    let borrower = errors.uuid("user_id", body.user_id.as_deref()).unwrap_or(user.user_id());
    let due_date = errors.date("due_date", body.due_date.as_deref());
    errors.finish()?;
    let item_id = item_id.ok_or_else(|| ApiError::field_error("item_id", "Must be a UUID"))?;

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;

    let item = Item::find_for_update(&mut *tx, user.org_id(), item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    if !item.is_available() {
        return Err(ApiError::conflict("Item is not available for borrowing"));
    }

    let borrower_in_org: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE org_id = $1 AND user_id = $2)",
    )
    .bind(user.org_id())
    .bind(borrower)
    .fetch_one(&mut *tx)
    .await?;
    if !borrower_in_org {
        return Err(ApiError::not_found("User not found"));
    }

    let item = sqlx::query_as::<_, Item>(
        "UPDATE items SET status = $1, assigned_to = $2, updated_at = now() WHERE item_id = $3 RETURNING *",
    )
    .bind(STATUS_BORROWED)
    .bind(borrower)
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;

    let scan = sqlx::query_as::<_, ScanHistory>(
        r#"
        INSERT INTO scan_history (org_id, user_id, item_id, item_name, serial_id, due_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'borrowed')
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(borrower)
    .bind(item.item_id)
    .bind(&item.item_name)
    .bind(&item.serial_id)
    .bind(due_date)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("Item {} borrowed by {}", item.item_id, borrower);

    Ok(ApiResponse::success(json!({ "item": item, "scan": scan })).with_message("Item borrowed successfully"))
}

/// POST /scanner/return
pub async fn return_post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<ReturnRequest>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let item_id = required_item_id(&mut errors, body.item_id.as_deref());
    let condition = present(body.condition_on_return.as_deref()).map(str::to_string);
    let reason = present(body.reason.as_deref()).map(str::to_string);
    errors.max_len("condition_on_return", condition.as_deref(), 100);
    errors.max_len("reason", reason.as_deref(), 1000);
    errors.finish()?;
    let item_id = item_id.ok_or_else(|| ApiError::field_error("item_id", "Must be a UUID"))?;

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;

    let item = Item::find_for_update(&mut *tx, user.org_id(), item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    if item.status != STATUS_BORROWED {
        return Err(ApiError::conflict("Item is not currently borrowed"));
    }
    let returned_by = item.assigned_to.unwrap_or(user.user_id());

    let item = sqlx::query_as::<_, Item>(
        r#"
        UPDATE items
        SET status = $1, assigned_to = NULL, condition = COALESCE($2, condition), updated_at = now()
        WHERE item_id = $3
        RETURNING *
        "#,
    )
    .bind(STATUS_AVAILABLE)
    .bind(&condition)
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;

    let item_return = sqlx::query_as::<_, ItemReturn>(
        r#"
        INSERT INTO item_returns (org_id, asset_id, user_id, condition_on_return, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(item_id)
    .bind(returned_by)
    .bind(&condition)
    .bind(&reason)
    .fetch_one(&mut *tx)
    .await?;

    let scan = sqlx::query_as::<_, ScanHistory>(
        r#"
        INSERT INTO scan_history (org_id, user_id, item_id, item_name, serial_id, status)
        VALUES ($1, $2, $3, $4, $5, 'returned')
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(user.user_id())
    .bind(item.item_id)
    .bind(&item.item_name)
    .bind(&item.serial_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("Item {} returned by {}", item.item_id, returned_by);

    Ok(ApiResponse::success(json!({
        "item": item,
        "return": item_return,
        "scan": scan,
    }))
    .with_message("Item returned successfully"))
}
