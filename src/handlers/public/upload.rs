// handlers/public/upload.rs - GET /upload/image/:image_id/:filename

use axum::{
    extract::Path,
    http::HeaderMap,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::api::image::image_response;
use crate::app::AppState;
use crate::error::ApiError;

/// Serve an uploaded image. Image ids are unguessable, so no token is needed.
pub async fn image_get(
    Extension(state): Extension<AppState>,
    Path((image_id, _filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let image_id = Uuid::parse_str(&image_id).map_err(|_| ApiError::not_found("Image not found"))?;
    let image = state.images.get(image_id).await?;
    Ok(image_response(image, &headers))
}
