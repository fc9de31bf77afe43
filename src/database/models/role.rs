use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const MANAGE_USERS: &str = "canManageUsers";
pub const MANAGE_ROLES: &str = "canManageRoles";
pub const MANAGE_ITEMS: &str = "canManageItems";
pub const MANAGE_ORDERS: &str = "canManageOrders";
pub const MANAGE_VENDORS: &str = "canManageVendors";
pub const VIEW_REPORTS: &str = "canViewReports";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub org_id: Uuid,
    pub role_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub permission_id: Uuid,
    pub permission_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub async fn find_in_org<'e>(
        executor: impl PgExecutor<'e>,
        org_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE org_id = $1 AND role_id = $2")
            .bind(org_id)
            .bind(role_id)
            .fetch_optional(executor)
            .await
    }
}

impl Permission {
    pub async fn all<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<Permission>, sqlx::Error> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY permission_name")
            .fetch_all(executor)
            .await
    }

    pub async fn for_role<'e>(executor: impl PgExecutor<'e>, role_id: Uuid) -> Result<Vec<Permission>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.permission_name
            "#,
        )
        .bind(role_id)
        .fetch_all(executor)
        .await
    }
}
