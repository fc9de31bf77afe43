// handlers/protected/organization.rs - Organization profile and logo under /organization

use axum::{
    extract::{Multipart, Path},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::organization_json;
use crate::api::image::upload_json;
use crate::api::validate::path_uuid;
use crate::api::MultipartForm;
use crate::app::AppState;
use crate::config::CONFIG;
use crate::database::models::Organization;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::storage::{ImageKind, NewImage};

const NOT_FOUND: &str = "Organization not found";

/// Members only see their own organization
fn own_org(user: &ValidatedUser, raw: &str) -> Result<Uuid, ApiError> {
    let org_id = path_uuid(raw, NOT_FOUND)?;
    if org_id != user.org_id() {
        return Err(ApiError::forbidden("Access denied to this organization"));
    }
    Ok(org_id)
}

async fn load(org_id: Uuid) -> Result<Organization, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    Organization::find_by_id(&pool, org_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

async fn logo_url(state: &AppState, org_id: Uuid) -> Result<Option<String>, ApiError> {
    let logos = state
        .images
        .list_by_ref(ImageKind::OrganizationLogo, &org_id.to_string())
        .await?;
    Ok(logos.first().map(|meta| meta.url()))
}

/// GET /organization/:org_id
pub async fn get(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(org_id): Path<String>,
) -> ApiResult<Value> {
    let org_id = own_org(&user, &org_id)?;
    let organization = load(org_id).await?;

    let mut body = organization_json(&organization);
    body["logoUrl"] = json!(logo_url(&state, org_id).await?);
    Ok(ApiResponse::success(body))
}

/// GET /organization/:org_id/logo
pub async fn logo_get(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(org_id): Path<String>,
) -> ApiResult<Value> {
    let org_id = own_org(&user, &org_id)?;
    let organization = load(org_id).await?;

    Ok(ApiResponse::success(json!({
        "org_id": organization.org_id,
        "name": organization.org_name,
        "logo_url": logo_url(&state, org_id).await?,
    })))
}

/// POST /organization/upload-logo/:org_id - multipart `logo`, replaces any previous logo
pub async fn logo_post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(org_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Value> {
    let org_id = own_org(&user, &org_id)?;
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("logo")
        .ok_or_else(|| ApiError::bad_request("No logo file uploaded"))?;

    let upload = NewImage::from_upload(file, ImageKind::OrganizationLogo, org_id, user.user_id())
        .owned_by(org_id.to_string());
    upload.validate_image(CONFIG.uploads.max_image_bytes)?;

    let owner = org_id.to_string();
    state.images.delete_by_ref(org_id, ImageKind::OrganizationLogo, &owner).await?;
    let meta = state.images.put(upload).await?;

    let pool = DatabaseManager::main_pool().await?;
    sqlx::query("UPDATE organizations SET logo_image_id = $2, org_picture = $3 WHERE org_id = $1")
        .bind(org_id)
        .bind(meta.image_id)
        .bind(meta.url())
        .execute(&pool)
        .await?;

    tracing::info!("Organization {} logo replaced with {}", org_id, meta.image_id);
    Ok(ApiResponse::created(upload_json(&meta)).with_message("Logo uploaded successfully"))
}
