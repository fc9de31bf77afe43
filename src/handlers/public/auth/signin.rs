// handlers/public/auth/signin.rs - POST /api/signin

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{format, ApiJson, FieldErrors};
use crate::auth;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/signin - exchange credentials for an access and refresh token
pub async fn signin_post(ApiJson(body): ApiJson<SigninRequest>) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let email = errors.required("email", body.email.as_deref()).to_lowercase();
    let password = body.password.unwrap_or_default();
    if password.is_empty() {
        errors.add("password", crate::api::validate::REQUIRED);
    }
    errors.finish()?;

    let service = AccountService::new().await?;
    let account = service.signin(&email, &password).await.map_err(|e| {
        tracing::info!("Signin failed for {}: {}", email, e);
        e
    })?;

    let tokens = auth::generate_token_pair(account.user.user_id)?;
    tracing::info!("Signin: user {} ({})", account.user.user_id, account.user.email);

    Ok(ApiResponse::success(json!({
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
        "user": format::user_json(&account),
        "organization": format::organization_json(&account.organization),
    }))
    .with_message("Login successful"))
}
