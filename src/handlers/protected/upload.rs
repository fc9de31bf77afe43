// handlers/protected/upload.rs - Authenticated uploads under /upload

use axum::{
    extract::{Multipart, Path},
    Extension,
};
use serde_json::Value;
use uuid::Uuid;

use crate::api::image::upload_json;
use crate::api::validate::path_uuid;
use crate::api::MultipartForm;
use crate::app::AppState;
use crate::config::CONFIG;
use crate::database::models::ItemListing;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::storage::{ImageKind, NewImage};

/// Take the image file sent as `field`, ready to store for the caller's organization
fn image_upload(form: &mut MultipartForm, field: &str, kind: ImageKind, user: &ValidatedUser) -> Result<NewImage, ApiError> {
    let file = form
        .take_file(field)
        .ok_or_else(|| ApiError::bad_request(format!("No file uploaded in '{}'", field)))?;
    let upload = NewImage::from_upload(file, kind, user.org_id(), user.user_id());
    upload.validate_image(CONFIG.uploads.max_image_bytes)?;
    Ok(upload)
}

/// POST /upload/organization-photo - multipart `photo`
pub async fn organization_photo_post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    multipart: Multipart,
) -> ApiResult<Value> {
    let mut form = MultipartForm::read(multipart).await?;
    let org_id = user.org_id();
    let upload = image_upload(&mut form, "photo", ImageKind::OrganizationPhoto, &user)?.owned_by(org_id.to_string());

    let meta = state.images.put(upload).await?;
    let pool = DatabaseManager::main_pool().await?;
    sqlx::query("UPDATE organizations SET org_picture = $2 WHERE org_id = $1")
        .bind(org_id)
        .bind(meta.url())
        .execute(&pool)
        .await?;

    Ok(ApiResponse::created(upload_json(&meta)).with_message("Organization photo uploaded"))
}

/// POST /upload/profile-picture - multipart `photo`
pub async fn profile_picture_post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    multipart: Multipart,
) -> ApiResult<Value> {
    let mut form = MultipartForm::read(multipart).await?;
    let user_id = user.user_id();
    let upload = image_upload(&mut form, "photo", ImageKind::ProfilePicture, &user)?.owned_by(user_id.to_string());

    state
        .images
        .delete_by_ref(user.org_id(), ImageKind::ProfilePicture, &user_id.to_string())
        .await?;
    let meta = state.images.put(upload).await?;

    let pool = DatabaseManager::main_pool().await?;
    sqlx::query(
        r#"
        INSERT INTO profile_info (user_id, profile_picture, email) VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET profile_picture = $2
        "#,
    )
    .bind(user_id)
    .bind(meta.url())
    .bind(&user.user.email)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::created(upload_json(&meta)).with_message("Profile picture uploaded"))
}

/// POST /upload/item-image - multipart `image`, optionally attached to `item_id`
pub async fn item_image_post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    multipart: Multipart,
) -> ApiResult<Value> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut upload = image_upload(&mut form, "image", ImageKind::ItemImage, &user)?;

    if let Some(raw) = form.field("item_id").map(str::trim).filter(|s| !s.is_empty()) {
        let item_id = Uuid::parse_str(raw).map_err(|_| ApiError::field_error("item_id", "Must be a UUID"))?;
        let pool = DatabaseManager::main_pool().await?;
        if ItemListing::find_in_org(&pool, user.org_id(), item_id).await?.is_none() {
            return Err(ApiError::not_found("Item not found"));
        }
        state
            .images
            .delete_by_ref(user.org_id(), ImageKind::ItemImage, &item_id.to_string())
            .await?;
        upload = upload.owned_by(item_id.to_string());
    }

    let meta = state.images.put(upload).await?;
    Ok(ApiResponse::created(upload_json(&meta)).with_message("Item image uploaded"))
}

/// DELETE /upload/image/:image_id
pub async fn image_delete(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(image_id): Path<String>,
) -> ApiResult<()> {
    let image_id = path_uuid(&image_id, "Image not found")?;
    state.images.delete(user.org_id(), image_id).await?;

    tracing::info!("Image {} deleted by {}", image_id, user.user_id());
    Ok(ApiResponse::message("Image deleted successfully"))
}
