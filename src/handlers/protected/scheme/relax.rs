use axum::{
    extract::{Multipart, Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::Value;

use super::{repository, writable_repository};
use crate::api::MultipartForm;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::scheme::relax::{self, RelaxDocument};

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    pub model: Option<String>,
    pub id: Option<String>,
}

/// GET /scheme/relax/read?model=&id=
pub async fn read(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<RelaxDocument> {
    let (Some(model), Some(id)) = (query.model.as_deref(), query.id.as_deref()) else {
        return Err(ApiError::bad_request("Query parameters 'model' and 'id' are required"));
    };
    let repo = repository(model, &user).await?;
    let document = relax::read(&repo, state.images.as_ref(), user.org_id(), id).await?;
    Ok(ApiResponse::success(document))
}

/// Optional `body` form field holding the document as JSON text
pub fn document_body(form: &MultipartForm) -> Result<Option<Value>, ApiError> {
    match form.field("body").map(str::trim).filter(|b| !b.is_empty()) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| ApiError::field_error("body", format!("Invalid JSON: {}", e))),
    }
}

/// PUT /scheme/relax/multi/:model - multipart `id`, optional `body`, any number of files
pub async fn multi(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    multipart: Multipart,
) -> ApiResult<RelaxDocument> {
    let repo = writable_repository(&model, &user).await?;
    let form = MultipartForm::read(multipart).await?;
    let id = form
        .field("id")
        .map(str::to_string)
        .ok_or_else(|| ApiError::field_error("id", "This field is required"))?;
    let body = document_body(&form)?;

    let document = relax::upsert(
        &repo,
        state.images.as_ref(),
        user.org_id(),
        user.user_id(),
        &id,
        body,
        form.files,
    )
    .await?;
    Ok(ApiResponse::success(document))
}
