use axum::Extension;
use serde_json::Value;

use crate::api::format;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

/// GET /api/verify - the token's user and organization
pub async fn verify_get(Extension(user): Extension<ValidatedUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(format::account_json(&user)))
}

/// POST /api/logout - tokens are stateless; the client discards them
pub async fn logout_post(Extension(user): Extension<ValidatedUser>) -> ApiResult<()> {
    tracing::info!("User {} logged out", user.user_id());
    Ok(ApiResponse::message("Logout successful"))
}
