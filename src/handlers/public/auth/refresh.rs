// handlers/public/auth/refresh.rs - POST /api/refresh-token

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiJson, FieldErrors};
use crate::auth;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /api/refresh-token - issue a new access token for a valid refresh token
pub async fn refresh_post(ApiJson(body): ApiJson<RefreshRequest>) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let token = errors.required("refreshToken", body.refresh_token.as_deref());
    errors.finish()?;

    let claims = auth::validate_refresh_token(token).map_err(|e| match e {
        auth::JwtError::Expired => ApiError::token_expired("Refresh token expired"),
        auth::JwtError::Invalid(_) | auth::JwtError::WrongKind => ApiError::unauthorized("Invalid refresh token"),
        other => ApiError::from(other),
    })?;

    let service = AccountService::new().await?;
    let account = service
        .load_account(claims.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !account.user.is_active() {
        return Err(ApiError::forbidden("Account is not active"));
    }

    let access_token = auth::generate_access_token(account.user.user_id)?;
    tracing::debug!("Refreshed access token for {}", account.user.user_id);

    Ok(ApiResponse::success(json!({ "accessToken": access_token })))
}
