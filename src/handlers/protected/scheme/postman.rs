use axum::Extension;
use serde_json::Value;

use crate::api::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::scheme::postman::{self, PostmanOptions};

/// POST /scheme/postman/generate
pub async fn post(
    Extension(_user): Extension<ValidatedUser>,
    ApiJson(options): ApiJson<PostmanOptions>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(postman::generate(&options)?))
}
