use axum::{extract::Path, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::validate::{path_uuid, present};
use crate::api::{ApiJson, FieldErrors};
use crate::app::AppState;
use crate::auth::password;
use crate::auth::validation::{is_valid_email, normalize_email};
use crate::config::CONFIG;
use crate::database::models::role::MANAGE_USERS;
use crate::database::models::{Role, User, UserListing};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::account_service::{AccountService, NewMember};
use crate::storage::{ImageKind, NewImage};

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
    pub role_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// Image URL, or a base64 data URL to store as the user's picture
    pub user_pic: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
}

async fn listing(org_id: Uuid, user_id: Uuid) -> Result<UserListing, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    UserListing::find_in_org(&pool, org_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// GET /user/:id
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
) -> ApiResult<UserListing> {
    let id = path_uuid(&id, NOT_FOUND)?;
    Ok(ApiResponse::success(listing(user.org_id(), id).await?))
}

/// POST /user - add an active member to the caller's organization
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<UserListing> {
    user.require(MANAGE_USERS)?;

    let mut errors = FieldErrors::new();
    let full_name = errors.required("full_name", body.full_name.as_deref());
    let email = errors.email("email", body.email.as_deref());
    let new_password = errors.password("password", body.password.as_deref());
    let role_id = errors.uuid("role_id", body.role_id.as_deref());
    errors.max_len("full_name", Some(full_name), 255);
    errors.finish()?;

    let service = AccountService::new().await?;
    let mut tx = service.pool().begin().await?;

    if User::email_exists(&mut *tx, &email).await? {
        return Err(ApiError::conflict("User with this email already exists"));
    }
    if let Some(role_id) = role_id {
        if Role::find_in_org(&mut *tx, user.org_id(), role_id).await?.is_none() {
            return Err(ApiError::field_error("role_id", "Role not found in this organization"));
        }
    }

    let created = AccountService::insert_member(
        &mut tx,
        user.org_id(),
        NewMember {
            full_name: full_name.to_string(),
            email,
            password_hash: password::hash_password(new_password)?,
            role_id,
            department: present(body.department.as_deref()).map(str::to_string),
            branch: present(body.branch.as_deref()).map(str::to_string),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!("User {} added to {} by {}", created.user_id, user.org_id(), user.user_id());
    Ok(ApiResponse::created(listing(user.org_id(), created.user_id).await?).with_message("User created successfully"))
}

/// PATCH /user/:id - members may edit themselves; editing others needs canManageUsers
pub async fn patch(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserChanges>,
) -> ApiResult<UserListing> {
    let id = path_uuid(&id, NOT_FOUND)?;
    if id != user.user_id() {
        user.require(MANAGE_USERS)?;
    }

    let mut errors = FieldErrors::new();
    let full_name = present(body.full_name.as_deref());
    let email = present(body.email.as_deref()).map(normalize_email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.add("email", "Invalid email format");
        }
    }
    errors.max_len("full_name", full_name, 255);
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    let current = listing(user.org_id(), id).await?;

    if let Some(email) = &email {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND user_id <> $2)")
            .bind(email)
            .bind(id)
            .fetch_one(&pool)
            .await?;
        if taken {
            return Err(ApiError::conflict("User with this email already exists"));
        }
    }

    let user_pic = match present(body.user_pic.as_deref()) {
        Some(pic) if pic.starts_with("data:") => {
            let image = NewImage::from_data_url(
                pic,
                ImageKind::UserPicture,
                user.org_id(),
                user.user_id(),
                &format!("user-{}", id),
            )?
            .owned_by(id.to_string());
            image.validate_image(CONFIG.uploads.max_image_bytes)?;
            state.images.delete_by_ref(user.org_id(), ImageKind::UserPicture, &id.to_string()).await?;
            Some(state.images.put(image).await?.url())
        }
        other => other.map(str::to_string),
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        UPDATE users SET
            full_name  = COALESCE($3, full_name),
            email      = COALESCE($4, email),
            user_pic   = COALESCE($5, user_pic),
            department = COALESCE($6, department),
            branch     = COALESCE($7, branch)
        WHERE org_id = $1 AND user_id = $2
        "#,
    )
    .bind(user.org_id())
    .bind(id)
    .bind(full_name)
    .bind(&email)
    .bind(&user_pic)
    .bind(present(body.department.as_deref()))
    .bind(present(body.branch.as_deref()))
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "UPDATE profile_info SET user_name = COALESCE($2, user_name), email = COALESCE($3, email) WHERE user_id = $1",
    )
    .bind(id)
    .bind(full_name)
    .bind(&email)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!("User {} updated by {}", current.user_id, user.user_id());
    Ok(ApiResponse::success(listing(user.org_id(), id).await?).with_message("User updated successfully"))
}

/// DELETE /user/:id
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(MANAGE_USERS)?;
    let id = path_uuid(&id, NOT_FOUND)?;
    if id == user.user_id() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let pool = DatabaseManager::main_pool().await?;
    let deleted = sqlx::query("DELETE FROM users WHERE org_id = $1 AND user_id = $2")
        .bind(user.org_id())
        .bind(id)
        .execute(&pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    let owner = id.to_string();
    state.images.delete_by_ref(user.org_id(), ImageKind::UserPicture, &owner).await?;
    state.images.delete_by_ref(user.org_id(), ImageKind::ProfilePicture, &owner).await?;

    tracing::info!("User {} deleted by {}", id, user.user_id());
    Ok(ApiResponse::message("User deleted successfully"))
}
