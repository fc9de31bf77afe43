use axum::{
    extract::{Path, Request},
    Extension,
};
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use super::input::{item_fields, ItemFields};
use super::listing_json;
use crate::api::validate::path_uuid;
use crate::api::MultipartForm;
use crate::app::AppState;
use crate::config::CONFIG;
use crate::database::models::role::MANAGE_ITEMS;
use crate::database::models::ItemListing;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::storage::{put_before_commit, ImageKind, NewImage};

const NOT_FOUND: &str = "Item not found";

/// GET /items/:item_id
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Path(item_id): Path<String>,
) -> ApiResult<Value> {
    let item_id = path_uuid(&item_id, NOT_FOUND)?;
    let pool = DatabaseManager::main_pool().await?;
    let item = ItemListing::find_in_org(&pool, user.org_id(), item_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::success(listing_json(&item)))
}

/// POST /items - JSON or multipart with an optional `image` file
pub async fn post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    request: Request,
) -> ApiResult<Value> {
    user.require(MANAGE_ITEMS)?;
    let mut form = MultipartForm::read_any(request).await?;
    let fields = item_fields(&form, true)?;
    let image = take_image(&mut form, &user)?;

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    check_references(&mut tx, user.org_id(), &fields).await?;
    if let Some(serial) = &fields.serial_id {
        ensure_serial_free(&mut tx, user.org_id(), serial, None).await?;
    }

    let item_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO items (item_id, org_id, vendor_id, item_name, description, serial_id, condition,
                           purchase_date, assigned_to, status, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(item_id)
    .bind(user.org_id())
    .bind(fields.vendor_id)
    .bind(&fields.item_name)
    .bind(&fields.description)
    .bind(&fields.serial_id)
    .bind(&fields.condition)
    .bind(fields.purchase_date)
    .bind(fields.assigned_to)
    .bind(&fields.status)
    .bind(&fields.location)
    .execute(&mut *tx)
    .await?;

    let uploads: Vec<NewImage> = image.map(|i| i.owned_by(item_id.to_string())).into_iter().collect();
    put_before_commit(state.images.as_ref(), uploads, async move {
        tx.commit().await.map_err(ApiError::from)
    })
    .await?;

    let item = ItemListing::find_in_org(&pool, user.org_id(), item_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    tracing::info!("Item {} ({}) created in {}", item.item_id, item.serial_id, user.org_id());
    Ok(ApiResponse::created(listing_json(&item)).with_message("Item created successfully"))
}

/// PUT /items/:item_id - change the supplied fields; an `image` file replaces the current one
pub async fn put(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(item_id): Path<String>,
    request: Request,
) -> ApiResult<Value> {
    user.require(MANAGE_ITEMS)?;
    let item_id = path_uuid(&item_id, NOT_FOUND)?;
    let mut form = MultipartForm::read_any(request).await?;
    let fields = item_fields(&form, false)?;
    let image = take_image(&mut form, &user)?;

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    check_references(&mut tx, user.org_id(), &fields).await?;
    if let Some(serial) = &fields.serial_id {
        ensure_serial_free(&mut tx, user.org_id(), serial, Some(item_id)).await?;
    }

    let updated = sqlx::query(
        r#"
        UPDATE items SET
            vendor_id     = COALESCE($3, vendor_id),
            item_name     = COALESCE($4, item_name),
            description   = COALESCE($5, description),
            serial_id     = COALESCE($6, serial_id),
            condition     = COALESCE($7, condition),
            purchase_date = COALESCE($8, purchase_date),
            assigned_to   = COALESCE($9, assigned_to),
            status        = COALESCE($10, status),
            location      = COALESCE($11, location),
            updated_at    = now()
        WHERE org_id = $1 AND item_id = $2
        "#,
    )
    .bind(user.org_id())
    .bind(item_id)
    .bind(fields.vendor_id)
    .bind(&fields.item_name)
    .bind(&fields.description)
    .bind(&fields.serial_id)
    .bind(&fields.condition)
    .bind(fields.purchase_date)
    .bind(fields.assigned_to)
    .bind(&fields.status)
    .bind(&fields.location)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    let owner = item_id.to_string();
    let previous = match &image {
        Some(_) => state.images.list_by_ref(ImageKind::ItemImage, &owner).await?,
        None => Vec::new(),
    };
    let uploads: Vec<NewImage> = image.map(|i| i.owned_by(owner.clone())).into_iter().collect();
    put_before_commit(state.images.as_ref(), uploads, async move {
        tx.commit().await.map_err(ApiError::from)
    })
    .await?;

    // the new image is already the newest for this item
    for old in previous {
        if let Err(err) = state.images.delete(user.org_id(), old.image_id).await {
            tracing::warn!("Could not remove replaced image {}: {}", old.image_id, err);
        }
    }

    let item = ItemListing::find_in_org(&pool, user.org_id(), item_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::success(listing_json(&item)).with_message("Item updated successfully"))
}

/// DELETE /items/:item_id - the item and any image it has
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(item_id): Path<String>,
) -> ApiResult<()> {
    user.require(MANAGE_ITEMS)?;
    let item_id = path_uuid(&item_id, NOT_FOUND)?;
    let pool = DatabaseManager::main_pool().await?;

    let deleted = sqlx::query("DELETE FROM items WHERE org_id = $1 AND item_id = $2")
        .bind(user.org_id())
        .bind(item_id)
        .execute(&pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    let removed = state
        .images
        .delete_by_ref(user.org_id(), ImageKind::ItemImage, &item_id.to_string())
        .await?;
    tracing::info!("Item {} deleted with {} image(s)", item_id, removed);
    Ok(ApiResponse::message("Item deleted successfully"))
}

fn take_image(form: &mut MultipartForm, user: &ValidatedUser) -> Result<Option<NewImage>, ApiError> {
    let Some(file) = form.take_file("image") else {
        return Ok(None);
    };
    let image = NewImage::from_upload(file, ImageKind::ItemImage, user.org_id(), user.user_id());
    image.validate_image(CONFIG.uploads.max_image_bytes)?;
    Ok(Some(image))
}

/// Vendor and assignee must both belong to the caller's organization
async fn check_references(conn: &mut PgConnection, org_id: Uuid, fields: &ItemFields) -> Result<(), ApiError> {
    if let Some(vendor_id) = fields.vendor_id {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vendors WHERE org_id = $1 AND vendor_id = $2)",
        )
        .bind(org_id)
        .bind(vendor_id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(ApiError::field_error("vendor_id", "Vendor not found in this organization"));
        }
    }
    if let Some(user_id) = fields.assigned_to {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE org_id = $1 AND user_id = $2)",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(ApiError::field_error("assigned_to", "User not found in this organization"));
        }
    }
    Ok(())
}

async fn ensure_serial_free(
    conn: &mut PgConnection,
    org_id: Uuid,
    serial_id: &str,
    except: Option<Uuid>,
) -> Result<(), ApiError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM items WHERE org_id = $1 AND serial_id = $2 AND ($3::uuid IS NULL OR item_id <> $3))",
    )
    .bind(org_id)
    .bind(serial_id)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;
    if taken {
        return Err(ApiError::conflict("An item with this serial ID already exists"));
    }
    Ok(())
}
