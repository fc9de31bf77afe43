use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const STATUS_ACTIVE: &str = "active";
pub const USER_STATUSES: [&str; 2] = [STATUS_ACTIVE, "inactive"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub status: String,
    pub user_pic: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User row joined with its role name, as listed and exported
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserListing {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role_id: Option<Uuid>,
    pub role_name: Option<String>,
    pub full_name: String,
    pub email: String,
    pub status: String,
    pub user_pic: Option<String>,
    pub department: Option<String>,
    pub branch: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const LISTING_SELECT: &str = r#"
    SELECT u.user_id, u.org_id, u.role_id, r.role_name, u.full_name, u.email,
           u.status, u.user_pic, u.department, u.branch, u.created_at
    FROM users u
    LEFT JOIN roles r ON r.role_id = u.role_id AND r.org_id = u.org_id
"#;

impl User {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    pub async fn find_by_id<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_email<'e>(executor: impl PgExecutor<'e>, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    pub async fn email_exists<'e>(executor: impl PgExecutor<'e>, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(executor)
            .await
    }
}

impl UserListing {
    pub async fn find_in_org<'e>(
        executor: impl PgExecutor<'e>,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<UserListing>, sqlx::Error> {
        let sql = format!("{} WHERE u.org_id = $1 AND u.user_id = $2", LISTING_SELECT);
        sqlx::query_as::<_, UserListing>(&sql)
            .bind(org_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }
}
