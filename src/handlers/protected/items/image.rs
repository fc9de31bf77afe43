use axum::{
    extract::Path,
    http::HeaderMap,
    response::Response,
    Extension,
};

use crate::api::image::image_response;
use crate::api::validate::path_uuid;
use crate::app::AppState;
use crate::database::models::ItemListing;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::storage::ImageKind;

/// GET /items/:item_id/image
pub async fn get(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let item_id = path_uuid(&item_id, "Item not found")?;
    let pool = DatabaseManager::main_pool().await?;
    if ItemListing::find_in_org(&pool, user.org_id(), item_id).await?.is_none() {
        return Err(ApiError::not_found("Item not found"));
    }

    let image = state
        .images
        .get_by_ref(ImageKind::ItemImage, &item_id.to_string())
        .await?;
    Ok(image_response(image, &headers))
}
