// handlers/protected/profile.rs - /profile, /security and /notifications for the signed-in user

use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::validate::{present, REQUIRED};
use crate::api::{ApiJson, FieldErrors};
use crate::app::AppState;
use crate::auth::password;
use crate::config::CONFIG;
use crate::database::models::NotificationPreferences;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::storage::{ImageKind, NewImage};

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub branch: Option<String>,
    pub user_name: Option<String>,
    pub profile_picture: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub user_name: Option<String>,
    /// Image URL, or a base64 data URL to store as the profile picture
    pub profile_picture: Option<String>,
    pub phone_number: Option<String>,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

async fn load_profile(user_id: Uuid) -> Result<ProfileView, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    sqlx::query_as::<_, ProfileView>(
        r#"
        SELECT u.user_id, u.full_name, u.email, u.department, u.branch,
               p.user_name, p.profile_picture, p.phone_number
        FROM users u
        LEFT JOIN profile_info p ON p.user_id = u.user_id
        WHERE u.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /profile
pub async fn get(Extension(user): Extension<ValidatedUser>) -> ApiResult<ProfileView> {
    Ok(ApiResponse::success(load_profile(user.user_id()).await?))
}

/// PUT /profile - only the given fields change
pub async fn put(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<ProfileChanges>,
) -> ApiResult<ProfileView> {
    let full_name = present(body.full_name.as_deref());
    let user_name = present(body.user_name.as_deref());
    let phone_number = present(body.phone_number.as_deref());

    let mut errors = FieldErrors::new();
    errors.max_len("fullName", full_name, 255);
    errors.max_len("userName", user_name, 255);
    errors.max_len("phoneNumber", phone_number, 50);
    errors.max_len("department", body.department.as_deref(), 255);
    errors.max_len("branch", body.branch.as_deref(), 255);
    errors.finish()?;

    let user_id = user.user_id();
    let picture = match present(body.profile_picture.as_deref()) {
        Some(url) if url.starts_with("data:") => {
            let upload = NewImage::from_data_url(url, ImageKind::ProfilePicture, user.org_id(), user_id, "profile")?
                .owned_by(user_id.to_string());
            upload.validate_image(CONFIG.uploads.max_image_bytes)?;
            state
                .images
                .delete_by_ref(user.org_id(), ImageKind::ProfilePicture, &user_id.to_string())
                .await?;
            Some(state.images.put(upload).await?.url())
        }
        other => other.map(str::to_string),
    };

    let pool = DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        UPDATE users
        SET full_name  = COALESCE($2, full_name),
            department = COALESCE($3, department),
            branch     = COALESCE($4, branch)
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(full_name)
    .bind(present(body.department.as_deref()))
    .bind(present(body.branch.as_deref()))
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        INSERT INTO profile_info (user_id, user_name, profile_picture, email, phone_number)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE
        SET user_name       = COALESCE($2, profile_info.user_name),
            profile_picture = COALESCE($3, profile_info.profile_picture),
            phone_number    = COALESCE($5, profile_info.phone_number)
        "#,
    )
    .bind(user_id)
    .bind(user_name)
    .bind(&picture)
    .bind(&user.user.email)
    .bind(phone_number)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(ApiResponse::success(load_profile(user_id).await?).with_message("Profile updated successfully"))
}

/// PUT /security - change password after confirming the current one
pub async fn security_put(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<PasswordChange>,
) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if present(body.old_password.as_deref()).is_none() {
        errors.add("oldPassword", REQUIRED);
    }
    let new_password = errors.password("newPassword", body.new_password.as_deref());
    errors.finish()?;

    let old_password = body.old_password.as_deref().unwrap_or_default();
    if !password::verify_password(old_password, &user.user.password) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = password::hash_password(new_password)?;
    let pool = DatabaseManager::main_pool().await?;
    sqlx::query("UPDATE users SET password = $2 WHERE user_id = $1")
        .bind(user.user_id())
        .bind(hash)
        .execute(&pool)
        .await?;

    tracing::info!("Password changed for user {}", user.user_id());
    Ok(ApiResponse::message("Password updated successfully"))
}

/// Overlay the keys present in `changes` onto `current`
pub fn merge_preferences(current: &NotificationPreferences, changes: &Value) -> Result<NotificationPreferences, ApiError> {
    let Value::Object(changes) = changes else {
        return Err(ApiError::invalid_json("Request body must be a JSON object"));
    };
    let mut merged = serde_json::to_value(current)
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;
    if let Value::Object(target) = &mut merged {
        for (key, value) in changes {
            if target.contains_key(key) {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    serde_json::from_value(merged).map_err(|_| ApiError::bad_request("Notification preferences must be true or false"))
}

async fn load_preferences(user_id: Uuid) -> Result<NotificationPreferences, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let stored: Option<Value> =
        sqlx::query_scalar("SELECT preferences FROM notification_preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?;
    // rows written by older clients may miss keys; those fall back to defaults
    Ok(stored
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default())
}

/// GET /notifications
pub async fn notifications_get(Extension(user): Extension<ValidatedUser>) -> ApiResult<NotificationPreferences> {
    Ok(ApiResponse::success(load_preferences(user.user_id()).await?))
}

/// PUT /notifications - partial update of the stored preferences
pub async fn notifications_put(
    Extension(user): Extension<ValidatedUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<NotificationPreferences> {
    let current = load_preferences(user.user_id()).await?;
    let preferences = merge_preferences(&current, &body)?;
    let stored = serde_json::to_value(&preferences).map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    let pool = DatabaseManager::main_pool().await?;
    sqlx::query(
        r#"
        INSERT INTO notification_preferences (user_id, preferences)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET preferences = $2, updated_at = now()
        "#,
    )
    .bind(user.user_id())
    .bind(stored)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::success(preferences).with_message("Notification preferences updated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_unspecified_preferences() {
        let merged = merge_preferences(
            &NotificationPreferences::default(),
            &json!({"smsNotifications": true, "emailNotifications": false}),
        )
        .unwrap();
        assert!(merged.sms_notifications);
        assert!(!merged.email_notifications);
        assert!(merged.push_notifications);
        assert!(merged.security_alerts);
    }

    #[test]
    fn test_merge_ignores_unknown_keys() {
        let merged = merge_preferences(&NotificationPreferences::default(), &json!({"carrierPigeon": true})).unwrap();
        assert_eq!(merged, NotificationPreferences::default());
    }

    #[test]
    fn test_merge_rejects_non_boolean_values() {
        let err = merge_preferences(&NotificationPreferences::default(), &json!({"orderUpdates": "yes"})).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(merge_preferences(&NotificationPreferences::default(), &json!([true])).is_err());
    }
}
