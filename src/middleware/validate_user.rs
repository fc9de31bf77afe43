use axum::{extract::Request, middleware::Next, response::Response};
use std::ops::Deref;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::{Account, AccountService};

/// The authenticated, active user with organization, role and permission names
#[derive(Clone, Debug)]
pub struct ValidatedUser(pub Account);

impl ValidatedUser {
    pub fn user_id(&self) -> Uuid {
        self.0.user.user_id
    }

    /// Tenant every request from this user is scoped to
    pub fn org_id(&self) -> Uuid {
        self.0.user.org_id
    }

    /// 403 unless the user's role grants `permission`
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.0.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!("User {} lacks permission {}", self.user_id(), permission);
            Err(ApiError::forbidden("Access denied. Insufficient permissions."))
        }
    }

    /// Like `require`, for optional permission requirements
    pub fn require_opt(&self, permission: Option<&str>) -> Result<(), ApiError> {
        permission.map_or(Ok(()), |p| self.require(p))
    }
}

impl Deref for ValidatedUser {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.0
    }
}

/// Middleware that loads the token's user and checks the account is active.
/// Must run after `jwt_auth_middleware`.
pub async fn validate_user_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

    let service = AccountService::new().await?;
    let account = service.load_account(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!("Token for unknown user {}", auth_user.user_id);
        ApiError::not_found("User not found")
    })?;

    if !account.user.is_active() {
        tracing::warn!("Inactive user {} rejected", account.user.user_id);
        return Err(ApiError::forbidden("Account is not active"));
    }

    tracing::debug!(
        "User {} validated in organization {}",
        account.user.user_id,
        account.user.org_id
    );
    request.extensions_mut().insert(ValidatedUser(account));
    Ok(next.run(request).await)
}
