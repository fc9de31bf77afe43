use axum::{extract::Path, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::api::validate::path_uuid;
use crate::api::ApiJson;
use crate::database::models::role::MANAGE_ROLES;
use crate::database::models::{Permission, Role};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

pub const ROLE_NOT_FOUND: &str = "Role not found";

#[derive(Debug, Deserialize)]
pub struct PermissionsBody {
    pub permissions: Option<Value>,
}

/// `permissions` must be an array of permission ids
pub fn parse_permission_ids(value: Option<&Value>) -> Result<Vec<Uuid>, ApiError> {
    let invalid = || ApiError::field_error("permissions", "Permissions must be an array of permission IDs");
    let items = value.and_then(Value::as_array).ok_or_else(invalid)?;

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_str().and_then(|s| Uuid::parse_str(s).ok()).ok_or_else(invalid)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Replace the role's permission set; unknown ids are rejected
pub async fn replace_permissions(conn: &mut PgConnection, role_id: Uuid, ids: &[Uuid]) -> Result<Vec<Permission>, ApiError> {
    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE permission_id = ANY($1)")
        .bind(ids)
        .fetch_one(&mut *conn)
        .await?;
    if known != ids.len() as i64 {
        return Err(ApiError::field_error("permissions", "One or more permissions do not exist"));
    }

    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO role_permissions (role_id, permission_id) SELECT $1, unnest($2::uuid[])")
        .bind(role_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(Permission::for_role(&mut *conn, role_id).await?)
}

pub fn role_json(role: &Role, permissions: &[Permission]) -> Value {
    json!({
        "role": role,
        "permissions": permissions,
    })
}

/// GET /permissions
pub async fn catalogue_get() -> ApiResult<Vec<Permission>> {
    let pool = DatabaseManager::main_pool().await?;
    Ok(ApiResponse::success(Permission::all(&pool).await?))
}

/// GET /roles/:role_id/permissions
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Path(role_id): Path<String>,
) -> ApiResult<Value> {
    let role_id = path_uuid(&role_id, ROLE_NOT_FOUND)?;
    let pool = DatabaseManager::main_pool().await?;
    let role = Role::find_in_org(&pool, user.org_id(), role_id)
        .await?
        .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;
    let permissions = Permission::for_role(&pool, role_id).await?;
    Ok(ApiResponse::success(role_json(&role, &permissions)))
}

/// PUT /roles/:role_id/permissions - atomic replacement of the role's permissions
pub async fn put(
    Extension(user): Extension<ValidatedUser>,
    Path(role_id): Path<String>,
    ApiJson(body): ApiJson<PermissionsBody>,
) -> ApiResult<Value> {
    user.require(MANAGE_ROLES)?;
    let ids = parse_permission_ids(body.permissions.as_ref())?;
    let role_id = path_uuid(&role_id, ROLE_NOT_FOUND)?;

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE org_id = $1 AND role_id = $2 FOR UPDATE")
        .bind(user.org_id())
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found(ROLE_NOT_FOUND))?;
    let permissions = replace_permissions(&mut tx, role_id, &ids).await?;
    tx.commit().await?;

    tracing::info!("Role {} now has {} permission(s)", role_id, permissions.len());
    Ok(ApiResponse::success(role_json(&role, &permissions)).with_message("Role permissions updated"))
}
