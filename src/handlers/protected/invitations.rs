// handlers/protected/invitations.rs - POST /invitations

use axum::Extension;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::validate::present;
use crate::api::{ApiJson, FieldErrors};
use crate::app::AppState;
use crate::config::CONFIG;
use crate::database::models::invitation::{generate_token, STATUS_EXPIRED, STATUS_PENDING};
use crate::database::models::role::MANAGE_USERS;
use crate::database::models::{Invitation, Role, User};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::mailer::invitation_link;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub role_id: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
}

/// Invite someone into the caller's organization and mail them a one-time link
pub async fn post(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<InviteRequest>,
) -> ApiResult<Value> {
    user.require(MANAGE_USERS)?;

    let mut errors = FieldErrors::new();
    let email = errors.email("email", body.email.as_deref());
    let role_id = errors.uuid("role_id", body.role_id.as_deref());
    errors.max_len("department", body.department.as_deref(), 255);
    errors.max_len("branch", body.branch.as_deref(), 255);
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    if User::email_exists(&pool, &email).await? {
        return Err(ApiError::bad_request("User with this email already exists"));
    }
    if let Some(role_id) = role_id {
        if Role::find_in_org(&pool, user.org_id(), role_id).await?.is_none() {
            return Err(ApiError::field_error("role_id", "Role not found in this organization"));
        }
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(CONFIG.invitations.expiry_hours);

    let mut tx = pool.begin().await?;
    // a fresh invitation supersedes any still pending for the same address
    sqlx::query("UPDATE invitations SET status = $3 WHERE org_id = $1 AND email = $2 AND status = $4")
        .bind(user.org_id())
        .bind(&email)
        .bind(STATUS_EXPIRED)
        .bind(STATUS_PENDING)
        .execute(&mut *tx)
        .await?;
    let invitation = sqlx::query_as::<_, Invitation>(
        r#"
        INSERT INTO invitations (org_id, email, token, role_id, department, branch, status, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(&email)
    .bind(&token)
    .bind(role_id)
    .bind(present(body.department.as_deref()))
    .bind(present(body.branch.as_deref()))
    .bind(STATUS_PENDING)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let link = invitation_link(&CONFIG.invitations.app_url, &token);
    state.mailer.send_invitation(&email, &link).await?;

    tracing::info!("Invitation {} sent to {} by {}", invitation.id, email, user.user_id());
    Ok(ApiResponse::success(json!({
        "id": invitation.id,
        "email": invitation.email,
        "expires_at": invitation.expires_at,
    }))
    .with_message("Invitation sent successfully"))
}
