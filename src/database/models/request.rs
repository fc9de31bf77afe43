use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const REQUEST_STATUSES: [&str; 2] = ["APPROVED", "DECLINED"];
pub const SCAN_STATUSES: [&str; 3] = ["APPROVED", "DENIED", "PENDING"];

/// A request status is APPROVED, DECLINED or cleared with null
pub fn is_valid_request_status(status: Option<&str>) -> bool {
    status.map_or(true, |s| REQUEST_STATUSES.contains(&s))
}

pub fn is_valid_scan_status(status: &str) -> bool {
    SCAN_STATUSES.contains(&status)
}

/// Borrow request raised against an item serial
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowRequest {
    pub request_id: Uuid,
    pub org_id: Uuid,
    pub serial: String,
    pub name: String,
    pub requester: String,
    pub date: String,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserScan {
    pub scan_entry_id: Uuid,
    pub org_id: Uuid,
    pub serial: String,
    pub name: String,
    pub date: String,
    pub status: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status() {
        assert!(is_valid_request_status(Some("APPROVED")));
        assert!(is_valid_request_status(Some("DECLINED")));
        assert!(is_valid_request_status(None));
        assert!(!is_valid_request_status(Some("approved")));
        assert!(!is_valid_request_status(Some("PENDING")));
    }

    #[test]
    fn test_scan_status() {
        for status in SCAN_STATUSES {
            assert!(is_valid_scan_status(status));
        }
        assert!(!is_valid_scan_status("DECLINED"));
        assert!(!is_valid_scan_status(""));
    }
}
