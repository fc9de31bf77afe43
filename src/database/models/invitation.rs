use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_ACCEPTED: &str = "ACCEPTED";
pub const STATUS_EXPIRED: &str = "EXPIRED";

/// 32 random bytes as lowercase hex
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub role_id: Option<Uuid>,
    pub department: Option<String>,
    pub branch: Option<String>,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }

    pub async fn find_by_token<'e>(executor: impl PgExecutor<'e>, token: &str) -> Result<Option<Invitation>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = $1")
            .bind(token)
            .fetch_optional(executor)
            .await
    }

    /// Lock the invitation row for the rest of the transaction
    pub async fn find_by_token_for_update<'e>(
        executor: impl PgExecutor<'e>,
        token: &str,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = $1 FOR UPDATE")
            .bind(token)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_status<'e>(executor: impl PgExecutor<'e>, id: Uuid, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE invitations SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_at: DateTime<Utc>, status: &str) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            email: "new@example.com".into(),
            token: "t".into(),
            role_id: None,
            department: None,
            branch: None,
            status: status.into(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_expiry_and_status() {
        let now = Utc::now();
        assert!(invitation(now - Duration::minutes(1), STATUS_PENDING).is_expired(now));
        assert!(!invitation(now + Duration::hours(24), STATUS_PENDING).is_expired(now));
        assert!(!invitation(now, STATUS_ACCEPTED).is_pending());
    }
}
