// handlers/public/invitations.rs - Invitation acceptance (no token required)

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{format, ApiJson, FieldErrors};
use crate::auth::{self, password};
use crate::database::models::invitation::{Invitation, STATUS_ACCEPTED, STATUS_EXPIRED};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service::{AccountService, NewMember};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub token: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

/// POST /invitations/verify - check a token before showing the registration form
pub async fn verify_post(ApiJson(body): ApiJson<VerifyRequest>) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let token = errors.required("token", body.token.as_deref());
    errors.finish()?;

    let service = AccountService::new().await?;
    let invitation = Invitation::find_by_token(service.pool(), token)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid invitation token"))?;

    if !invitation.is_pending() {
        return Err(ApiError::bad_request("Invitation is no longer valid"));
    }
    if invitation.is_expired(Utc::now()) {
        Invitation::set_status(service.pool(), invitation.id, STATUS_EXPIRED).await?;
        tracing::info!("Invitation {} expired", invitation.id);
        return Err(ApiError::bad_request("Invitation has expired"));
    }

    Ok(ApiResponse::success(json!({
        "valid": true,
        "email": invitation.email,
        "role_id": invitation.role_id,
        "department": invitation.department,
        "branch": invitation.branch,
    })))
}

/// POST /invitations/register - create the invited user in the inviting organization
pub async fn register_post(ApiJson(body): ApiJson<RegisterRequest>) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    let token = errors.required("token", body.token.as_deref());
    let full_name = errors.required("full_name", body.full_name.as_deref());
    let new_password = errors.password("password", body.password.as_deref());
    errors.finish()?;

    let service = AccountService::new().await?;
    let mut tx = service.pool().begin().await?;

    let invitation = Invitation::find_by_token_for_update(&mut *tx, token)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid invitation token"))?;
    if !invitation.is_pending() || invitation.is_expired(Utc::now()) {
        return Err(ApiError::bad_request("Invitation is invalid or has expired"));
    }
    if User::email_exists(&mut *tx, &invitation.email).await? {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let user = AccountService::insert_member(
        &mut tx,
        invitation.org_id,
        NewMember {
            full_name: full_name.to_string(),
            email: invitation.email.clone(),
            password_hash: password::hash_password(new_password)?,
            role_id: invitation.role_id,
            department: invitation.department.clone(),
            branch: invitation.branch.clone(),
        },
    )
    .await?;
    Invitation::set_status(&mut *tx, invitation.id, STATUS_ACCEPTED).await?;

    let account = AccountService::load_account_with(&mut tx, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    tx.commit().await?;

    let tokens = auth::generate_token_pair(user.user_id)?;
    tracing::info!("Invitation {} accepted by {}", invitation.id, user.user_id);

    Ok(ApiResponse::created(json!({
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
        "user": format::user_json(&account),
        "organization": format::organization_json(&account.organization),
    }))
    .with_message("Registration successful"))
}
