use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub org_id: Uuid,
    pub org_name: String,
    pub org_location: Option<String>,
    pub org_picture: Option<String>,
    pub bio: Option<String>,
    pub logo_image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub async fn find_by_id<'e>(executor: impl PgExecutor<'e>, org_id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE org_id = $1")
            .bind(org_id)
            .fetch_optional(executor)
            .await
    }
}
