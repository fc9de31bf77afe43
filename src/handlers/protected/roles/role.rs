use axum::{extract::Path, Extension};
use serde::Deserialize;
use serde_json::Value;

use super::permissions::{parse_permission_ids, replace_permissions, role_json, ROLE_NOT_FOUND};
use crate::api::validate::{path_uuid, present};
use crate::api::{ApiJson, FieldErrors};
use crate::database::models::role::MANAGE_ROLES;
use crate::database::models::Role;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
pub struct NewRole {
    pub role_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RoleChanges {
    pub role_name: Option<String>,
    pub description: Option<String>,
}

/// GET /roles - newest first
pub async fn list(Extension(user): Extension<ValidatedUser>) -> ApiResult<Vec<Role>> {
    let pool = DatabaseManager::main_pool().await?;
    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE org_id = $1 ORDER BY created_at DESC")
        .bind(user.org_id())
        .fetch_all(&pool)
        .await?;
    Ok(ApiResponse::success(roles))
}

/// POST /roles - a role and its permissions in one transaction
pub async fn post(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<NewRole>,
) -> ApiResult<Value> {
    user.require(MANAGE_ROLES)?;

    let mut errors = FieldErrors::new();
    let role_name = errors.required("role_name", body.role_name.as_deref());
    errors.max_len("role_name", Some(role_name), 100);
    errors.finish()?;
    let ids = match &body.permissions {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => parse_permission_ids(Some(value))?,
    };

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    let role = sqlx::query_as::<_, Role>(
        "INSERT INTO roles (org_id, role_name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user.org_id())
    .bind(role_name)
    .bind(present(body.description.as_deref()))
    .fetch_one(&mut *tx)
    .await?;
    let permissions = replace_permissions(&mut tx, role.role_id, &ids).await?;
    tx.commit().await?;

    tracing::info!("Role {} ({}) created in {}", role.role_id, role.role_name, user.org_id());
    Ok(ApiResponse::created(role_json(&role, &permissions)).with_message("Role created successfully"))
}

/// PUT /roles/:role_id - rename or redescribe
pub async fn put(
    Extension(user): Extension<ValidatedUser>,
    Path(role_id): Path<String>,
    ApiJson(body): ApiJson<RoleChanges>,
) -> ApiResult<Role> {
    user.require(MANAGE_ROLES)?;
    let role_id = path_uuid(&role_id, ROLE_NOT_FOUND)?;
    let role_name = present(body.role_name.as_deref());
    let mut errors = FieldErrors::new();
    errors.max_len("role_name", role_name, 100);
    errors.finish()?;

    let pool = DatabaseManager::main_pool().await?;
    let role = sqlx::query_as::<_, Role>(
        r#"
        UPDATE roles SET role_name = COALESCE($3, role_name), description = COALESCE($4, description)
        WHERE org_id = $1 AND role_id = $2
        RETURNING *
        "#,
    )
    .bind(user.org_id())
    .bind(role_id)
    .bind(role_name)
    .bind(body.description.as_deref())
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;

    Ok(ApiResponse::success(role).with_message("Role updated successfully"))
}

/// DELETE /roles/:role_id - members keep their accounts without a role
pub async fn delete(
    Extension(user): Extension<ValidatedUser>,
    Path(role_id): Path<String>,
) -> ApiResult<()> {
    user.require(MANAGE_ROLES)?;
    let role_id = path_uuid(&role_id, ROLE_NOT_FOUND)?;

    let pool = DatabaseManager::main_pool().await?;
    let deleted = sqlx::query("DELETE FROM roles WHERE org_id = $1 AND role_id = $2")
        .bind(user.org_id())
        .bind(role_id)
        .execute(&pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found(ROLE_NOT_FOUND));
    }

    tracing::info!("Role {} deleted by {}", role_id, user.user_id());
    Ok(ApiResponse::message("Role deleted successfully"))
}
