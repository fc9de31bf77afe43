use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileInfo {
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub profile_picture: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Per-user notification switches; missing keys fall back to defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sms_notifications: bool,
    pub order_updates: bool,
    pub inventory_alerts: bool,
    pub security_alerts: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            sms_notifications: false,
            order_updates: true,
            inventory_alerts: true,
            security_alerts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.email_notifications && prefs.push_notifications);
        assert!(!prefs.sms_notifications);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let prefs: NotificationPreferences =
            serde_json::from_value(json!({"smsNotifications": true, "orderUpdates": false})).unwrap();
        assert!(prefs.sms_notifications);
        assert!(!prefs.order_updates);
        assert!(prefs.security_alerts);
    }
}
