use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanHistory {
    pub scan_id: Uuid,
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub serial_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItemReturn {
    pub return_id: Uuid,
    pub org_id: Uuid,
    pub asset_id: Uuid,
    pub user_id: Option<Uuid>,
    pub condition_on_return: Option<String>,
    pub reason: Option<String>,
    pub returned_at: DateTime<Utc>,
}
