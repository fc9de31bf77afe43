use axum::{extract::Path, Extension};
use serde_json::{json, Value};

use crate::database::models::ItemListing;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::protected::items::item_image_url;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::Account;

/// Everything the scanner screen shows about one asset
pub fn asset_card(item: &ItemListing, account: &Account) -> Value {
    let assignee = item.assigned_to.map(|user_id| {
        json!({
            "user_id": user_id,
            "full_name": item.assignee_name,
        })
    });
    let vendor = item.vendor_id.map(|vendor_id| {
        json!({
            "vendor_id": vendor_id,
            "vendor_name": item.vendor_name,
        })
    });

    json!({
        "item_id": item.item_id,
        "serial_id": item.serial_id,
        "item_name": item.item_name,
        "description": item.description,
        "borrow_status": item.status,
        "condition": item.condition,
        "location": item.location,
        "assigned_to": item.assigned_to,
        "image_url": item_image_url(item.item_id),
        "assignee": assignee,
        "organization": {
            "org_id": account.organization.org_id,
            "org_name": account.organization.org_name,
        },
        "vendor": vendor,
    })
}

/// GET /scanner/scan/:code
pub async fn get(
    Extension(user): Extension<ValidatedUser>,
    Path(code): Path<String>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::main_pool().await?;
    let item = ItemListing::find_by_code(&pool, user.org_id(), &code)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    tracing::debug!("Scanned {} -> {}", code, item.item_id);
    Ok(ApiResponse::success(asset_card(&item, &user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Organization, User};
    use chrono::Utc;
    use uuid::Uuid;

    fn account(org_id: Uuid) -> Account {
        Account {
            user: User {
                user_id: Uuid::new_v4(),
                org_id,
                role_id: None,
                full_name: "Sam".into(),
                email: "sam@example.com".into(),
                password: String::new(),
                status: "active".into(),
                user_pic: None,
                department: None,
                branch: None,
                created_at: Utc::now(),
            },
            organization: Organization {
                org_id,
                org_name: "Acme".into(),
                org_location: None,
                org_picture: None,
                bio: None,
                logo_image_id: None,
                created_at: Utc::now(),
            },
            role: None,
            permissions: vec![],
        }
    }

    #[test]
    fn test_asset_card() {
        let org_id = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let item = ItemListing {
            item_id: Uuid::new_v4(),
            org_id,
            vendor_id: None,
            vendor_name: None,
            item_name: "Drill".into(),
            description: None,
            serial_id: "S-1".into(),
            condition: "Good".into(),
            purchase_date: None,
            assigned_to: Some(assignee),
            assignee_name: Some("Ada".into()),
            status: "borrowed".into(),
            location: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let card = asset_card(&item, &account(org_id));
        assert_eq!(card["borrow_status"], "borrowed");
        assert_eq!(card["assignee"]["full_name"], "Ada");
        assert_eq!(card["organization"]["org_name"], "Acme");
        assert!(card["vendor"].is_null());
        assert_eq!(card["image_url"], format!("/items/{}/image", item.item_id));
    }
}
