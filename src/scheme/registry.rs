use once_cell::sync::Lazy;

use super::schema::{FieldDef, FieldKind, ModelSchema};
use super::SchemeError;
use crate::database::models::item::ITEM_STATUSES;
use crate::database::models::request::{REQUEST_STATUSES, SCAN_STATUSES};
use crate::database::models::role::{MANAGE_ITEMS, MANAGE_ROLES, MANAGE_USERS, MANAGE_VENDORS};
use crate::database::models::user::USER_STATUSES;

static MODELS: Lazy<Vec<ModelSchema>> = Lazy::new(|| {
    vec![
        organization(),
        user(),
        role(),
        permission(),
        vendor(),
        item(),
        item_return(),
        scan_history(),
        request(),
        user_scan(),
    ]
});

pub fn lookup(name: &str) -> Result<&'static ModelSchema, SchemeError> {
    MODELS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| SchemeError::UnknownModel(name.to_string()))
}

pub fn all() -> &'static [ModelSchema] {
    &MODELS
}

fn organization() -> ModelSchema {
    ModelSchema {
        name: "organization",
        table: "organizations",
        primary_key: "org_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("org_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_name", "Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("org_location", "Location", FieldKind::Text).max(255).searchable(),
            FieldDef::new("org_picture", "Picture", FieldKind::Text).no_report(),
            FieldDef::new("bio", "Bio", FieldKind::Text).max(1000).searchable(),
            FieldDef::new("logo_image_id", "Logo", FieldKind::Uuid).system().no_report(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
        ],
        write_permission: Some(MANAGE_USERS),
        creatable: false,
        writable: true,
        default_order: "created_at desc",
    }
}

fn user() -> ModelSchema {
    ModelSchema {
        name: "user",
        table: "users",
        primary_key: "user_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("user_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("role_id", "Role", FieldKind::Uuid).references("roles", "role_id"),
            FieldDef::new("full_name", "Full Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("email", "Email", FieldKind::Text).required().max(255).searchable().email(),
            FieldDef::new("password", "Password", FieldKind::Text).required().secret().password_policy(),
            FieldDef::new("status", "Status", FieldKind::Text).max(20).one_of(&USER_STATUSES),
            FieldDef::new("user_pic", "Picture", FieldKind::Text).no_report(),
            FieldDef::new("department", "Department", FieldKind::Text).max(255).searchable(),
            FieldDef::new("branch", "Branch", FieldKind::Text).max(255).searchable(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
        ],
        write_permission: Some(MANAGE_USERS),
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

fn role() -> ModelSchema {
    ModelSchema {
        name: "role",
        table: "roles",
        primary_key: "role_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("role_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("role_name", "Role Name", FieldKind::Text).required().max(100).searchable(),
            FieldDef::new("description", "Description", FieldKind::Text).max(1000).searchable(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
        ],
        write_permission: Some(MANAGE_ROLES),
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

fn permission() -> ModelSchema {
    ModelSchema {
        name: "permission",
        table: "permissions",
        primary_key: "permission_id",
        tenant_column: None,
        touch_column: None,
        fields: vec![
            FieldDef::new("permission_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("permission_name", "Permission", FieldKind::Text).required().max(100).searchable(),
            FieldDef::new("description", "Description", FieldKind::Text).searchable(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
        ],
        write_permission: None,
        creatable: false,
        writable: false,
        default_order: "permission_name asc",
    }
}

fn vendor() -> ModelSchema {
    ModelSchema {
        name: "vendor",
        table: "vendors",
        primary_key: "vendor_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("vendor_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("vendor_name", "Vendor Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("contact_email", "Contact Email", FieldKind::Text).max(255).searchable().email(),
            FieldDef::new("phone", "Phone", FieldKind::Text).max(50),
            FieldDef::new("address", "Address", FieldKind::Text).max(500),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
        ],
        write_permission: Some(MANAGE_VENDORS),
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

fn item() -> ModelSchema {
    ModelSchema {
        name: "item",
        table: "items",
        primary_key: "item_id",
        tenant_column: Some("org_id"),
        touch_column: Some("updated_at"),
        fields: vec![
            FieldDef::new("item_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("vendor_id", "Vendor", FieldKind::Uuid).references("vendors", "vendor_id"),
            FieldDef::new("item_name", "Item Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("description", "Description", FieldKind::Text).max(1000).searchable(),
            FieldDef::new("serial_id", "Serial ID", FieldKind::Text).required().max(100).searchable(),
            FieldDef::new("condition", "Condition", FieldKind::Text).max(100),
            FieldDef::new("purchase_date", "Purchase Date", FieldKind::Date),
            FieldDef::new("assigned_to", "Assigned To", FieldKind::Uuid).references("users", "user_id"),
            FieldDef::new("status", "Status", FieldKind::Text).max(20).one_of(&ITEM_STATUSES),
            FieldDef::new("location", "Location", FieldKind::Text).max(255).searchable(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
            FieldDef::new("updated_at", "Updated At", FieldKind::Timestamp).system(),
        ],
        write_permission: Some(MANAGE_ITEMS),
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

fn item_return() -> ModelSchema {
    ModelSchema {
        name: "item_return",
        table: "item_returns",
        primary_key: "return_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("return_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("asset_id", "Item", FieldKind::Uuid).required().references("items", "item_id"),
            FieldDef::new("user_id", "User", FieldKind::Uuid).references("users", "user_id"),
            FieldDef::new("condition_on_return", "Condition On Return", FieldKind::Text).max(100),
            FieldDef::new("reason", "Reason", FieldKind::Text).max(1000).searchable(),
            FieldDef::new("returned_at", "Returned At", FieldKind::Timestamp).system(),
        ],
        write_permission: None,
        creatable: false,
        writable: false,
        default_order: "returned_at desc",
    }
}

fn scan_history() -> ModelSchema {
    ModelSchema {
        name: "scan_history",
        table: "scan_history",
        primary_key: "scan_id",
        tenant_column: Some("org_id"),
        touch_column: None,
        fields: vec![
            FieldDef::new("scan_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("user_id", "User", FieldKind::Uuid).references("users", "user_id"),
            FieldDef::new("item_id", "Item", FieldKind::Uuid).references("items", "item_id"),
            FieldDef::new("item_name", "Item Name", FieldKind::Text).max(255).searchable(),
            FieldDef::new("serial_id", "Serial ID", FieldKind::Text).max(100).searchable(),
            FieldDef::new("due_date", "Due Date", FieldKind::Date),
            FieldDef::new("status", "Status", FieldKind::Text).required().max(50).searchable(),
            FieldDef::new("scanned_at", "Scanned At", FieldKind::Timestamp).system(),
        ],
        write_permission: None,
        creatable: true,
        writable: true,
        default_order: "scanned_at desc",
    }
}

fn request() -> ModelSchema {
    ModelSchema {
        name: "request",
        table: "requests",
        primary_key: "request_id",
        tenant_column: Some("org_id"),
        touch_column: Some("updated_at"),
        fields: vec![
            FieldDef::new("request_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("serial", "Serial", FieldKind::Text).required().max(100).searchable(),
            FieldDef::new("name", "Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("requester", "Requester", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("date", "Date", FieldKind::Text).required().max(50),
            FieldDef::new("status", "Status", FieldKind::Text).max(20).one_of(&REQUEST_STATUSES),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
            FieldDef::new("updated_at", "Updated At", FieldKind::Timestamp).system(),
        ],
        write_permission: None,
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

fn user_scan() -> ModelSchema {
    ModelSchema {
        name: "user_scan",
        table: "user_scans",
        primary_key: "scan_entry_id",
        tenant_column: Some("org_id"),
        touch_column: Some("updated_at"),
        fields: vec![
            FieldDef::new("scan_entry_id", "ID", FieldKind::Uuid).system(),
            FieldDef::new("org_id", "Organization", FieldKind::Uuid).system().no_report(),
            FieldDef::new("serial", "Serial", FieldKind::Text).required().max(100).searchable(),
            FieldDef::new("name", "Name", FieldKind::Text).required().max(255).searchable(),
            FieldDef::new("date", "Date", FieldKind::Text).required().max(50),
            FieldDef::new("status", "Status", FieldKind::Text).required().max(20).one_of(&SCAN_STATUSES),
            FieldDef::new("icon", "Icon", FieldKind::Text).required().max(255).no_report(),
            FieldDef::new("created_at", "Created At", FieldKind::Timestamp).system(),
            FieldDef::new("updated_at", "Updated At", FieldKind::Timestamp).system(),
        ],
        write_permission: None,
        creatable: true,
        writable: true,
        default_order: "created_at desc",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::POLICY_MESSAGE;
    use crate::database::record::{Operation, Record, RecordError};
    use serde_json::json;

    #[test]
    fn test_all_models_registered() {
        let names: Vec<_> = all().iter().map(|m| m.name).collect();
        for expected in [
            "organization", "user", "role", "permission", "vendor", "item",
            "item_return", "scan_history", "request", "user_scan",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(lookup("widget"), Err(SchemeError::UnknownModel(name)) if name == "widget"));
    }

    #[test]
    fn test_schema_consistency() {
        for model in all() {
            assert!(model.primary_field().is_some(), "{} lacks its primary key field", model.name);
            assert!(model.primary_field().unwrap().system);
            if let Some(tenant) = model.tenant_column {
                let field = model.field(tenant).expect("tenant column declared");
                assert!(field.system, "{} tenant column must be system", model.name);
            }
            if let Some(touch) = model.touch_column {
                assert!(model.field(touch).is_some());
            }
            let order_column = model.default_order.split_whitespace().next().unwrap();
            assert!(model.field(order_column).is_some(), "{} default order", model.name);
        }
    }

    #[test]
    fn test_password_is_secret() {
        let user = lookup("user").unwrap();
        let password = user.field("password").unwrap();
        assert!(password.secret && password.hidden);
    }

    #[test]
    fn test_user_input_rules() {
        let user = lookup("user").unwrap();
        let input = json!({
            "full_name": "Ada",
            "email": "NOT AN EMAIL @ X",
            "password": "a",
            "status": "superuser"
        });
        let errors = match Record::from_input(user, &input, Operation::Create) {
            Err(RecordError::Invalid(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        };
        assert_eq!(errors["email"], "Invalid email format");
        assert_eq!(errors["password"], POLICY_MESSAGE);
        assert_eq!(errors["status"], "Must be one of: active, inactive");

        let input = json!({"full_name": "Ada", "email": "ADA@Example.com", "password": "Sup3r$ecret"});
        let record = Record::from_input(user, &input, Operation::Create).unwrap();
        assert_eq!(record.get("email").unwrap().value.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_status_fields_are_enumerated() {
        let patch = |model: &str, key: &str, status: &str| {
            let schema = lookup(model).unwrap();
            let input = json!({key: "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "status": status});
            Record::from_input(schema, &input, Operation::Patch)
        };
        assert!(patch("item", "item_id", "borrowed").is_ok());
        assert!(patch("item", "item_id", "lost").is_err());
        assert!(patch("request", "request_id", "DECLINED").is_ok());
        assert!(patch("request", "request_id", "DENIED").is_err());
        assert!(patch("user_scan", "scan_entry_id", "PENDING").is_ok());
        assert!(patch("user_scan", "scan_entry_id", "DECLINED").is_err());
    }

    #[test]
    fn test_foreign_keys_are_tenant_references() {
        let referenced = |model: &str, field: &str| lookup(model).unwrap().field(field).unwrap().references.map(|r| r.table);
        assert_eq!(referenced("user", "role_id"), Some("roles"));
        assert_eq!(referenced("item", "vendor_id"), Some("vendors"));
        assert_eq!(referenced("item", "assigned_to"), Some("users"));
        assert_eq!(referenced("scan_history", "user_id"), Some("users"));
        assert_eq!(referenced("scan_history", "item_id"), Some("items"));
    }
}
