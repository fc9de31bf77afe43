use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const STATUS_AVAILABLE: &str = "available";
pub const STATUS_BORROWED: &str = "borrowed";
pub const ITEM_STATUSES: [&str; 2] = [STATUS_AVAILABLE, STATUS_BORROWED];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub item_id: Uuid,
    pub org_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub item_name: String,
    pub description: Option<String>,
    pub serial_id: String,
    pub condition: String,
    pub purchase_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub status: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item joined with its vendor and assignee names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItemListing {
    pub item_id: Uuid,
    pub org_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub item_name: String,
    pub description: Option<String>,
    pub serial_id: String,
    pub condition: String,
    pub purchase_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub status: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vendor {
    pub vendor_id: Uuid,
    pub org_id: Uuid,
    pub vendor_name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const LISTING_SELECT: &str = r#"
    SELECT i.item_id, i.org_id, i.vendor_id, v.vendor_name, i.item_name, i.description,
           i.serial_id, i.condition, i.purchase_date, i.assigned_to, u.full_name AS assignee_name,
           i.status, i.location, i.created_at, i.updated_at
    FROM items i
    LEFT JOIN vendors v ON v.vendor_id = i.vendor_id AND v.org_id = i.org_id
    LEFT JOIN users u ON u.user_id = i.assigned_to AND u.org_id = i.org_id
"#;

impl Item {
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }

    /// Lock the row for the rest of the transaction
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        org_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<Item>, sqlx::Error> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE org_id = $1 AND item_id = $2 FOR UPDATE")
            .bind(org_id)
            .bind(item_id)
            .fetch_optional(executor)
            .await
    }
}

impl ItemListing {
    pub async fn find_in_org<'e>(
        executor: impl PgExecutor<'e>,
        org_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<ItemListing>, sqlx::Error> {
        let sql = format!("{} WHERE i.org_id = $1 AND i.item_id = $2", LISTING_SELECT);
        sqlx::query_as::<_, ItemListing>(&sql)
            .bind(org_id)
            .bind(item_id)
            .fetch_optional(executor)
            .await
    }

    /// Match a scanned code against the serial id, or the item id when the code is a UUID
    pub async fn find_by_code<'e>(
        executor: impl PgExecutor<'e>,
        org_id: Uuid,
        code: &str,
    ) -> Result<Option<ItemListing>, sqlx::Error> {
        let as_uuid = Uuid::parse_str(code.trim()).ok();
        let sql = format!(
            "{} WHERE i.org_id = $1 AND (i.serial_id = $2 OR ($3::uuid IS NOT NULL AND i.item_id = $3)) ORDER BY (i.serial_id = $2) DESC LIMIT 1",
            LISTING_SELECT
        );
        sqlx::query_as::<_, ItemListing>(&sql)
            .bind(org_id)
            .bind(code.trim())
            .bind(as_uuid)
            .fetch_optional(executor)
            .await
    }
}
