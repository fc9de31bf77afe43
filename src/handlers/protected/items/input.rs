//! Item form validation shared by create and update.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::api::validate::present;
use crate::api::{FieldErrors, MultipartForm};
use crate::error::ApiError;

pub use crate::database::models::item::{ITEM_STATUSES, STATUS_AVAILABLE, STATUS_BORROWED};
pub const DEFAULT_CONDITION: &str = "Good";

/// Validated item fields; `None` means "not supplied"
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ItemFields {
    pub item_name: Option<String>,
    pub serial_id: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub vendor_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<String>,
    pub location: Option<String>,
}

/// Validate the item form. On create `item_name` and `serial_id` are required.
pub fn item_fields(form: &MultipartForm, creating: bool) -> Result<ItemFields, ApiError> {
    let mut errors = FieldErrors::new();
    let text = |name: &str| present(form.field(name)).map(str::to_string);

    let item_name = if creating {
        Some(errors.required("item_name", form.field("item_name")).to_string())
    } else {
        text("item_name")
    };
    let serial_id = if creating {
        Some(errors.required("serial_id", form.field("serial_id")).to_string())
    } else {
        text("serial_id")
    };
    let description = text("description");
    let condition = text("condition");
    let location = text("location");
    let status = text("status");

    errors.max_len("item_name", item_name.as_deref(), 255);
    errors.max_len("serial_id", serial_id.as_deref(), 100);
    errors.max_len("description", description.as_deref(), 1000);
    errors.max_len("condition", condition.as_deref(), 100);
    errors.max_len("location", location.as_deref(), 255);
    errors.one_of("status", status.as_deref(), &ITEM_STATUSES);

    let vendor_id = errors.uuid("vendor_id", form.field("vendor_id"));
    let assigned_to = errors.uuid("assigned_to", form.field("assigned_to"));
    let purchase_date = errors.date("purchase_date", form.field("purchase_date"));
    errors.finish()?;

    Ok(ItemFields {
        item_name: item_name.filter(|s| !s.is_empty()),
        serial_id: serial_id.filter(|s| !s.is_empty()),
        description,
        condition: condition.or_else(|| creating.then(|| DEFAULT_CONDITION.to_string())),
        purchase_date,
        vendor_id,
        assigned_to,
        status: status.or_else(|| creating.then(|| STATUS_AVAILABLE.to_string())),
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (k, v) in pairs {
            form.fields.insert(k.to_string(), v.to_string());
        }
        form
    }

    fn field_errors(err: ApiError) -> std::collections::HashMap<String, String> {
        match err {
            ApiError::ValidationError { field_errors: Some(errors), .. } => errors,
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn test_create_defaults() {
        let fields = item_fields(&form(&[("item_name", " Drill "), ("serial_id", "S-1")]), true).unwrap();
        assert_eq!(fields.item_name.as_deref(), Some("Drill"));
        assert_eq!(fields.condition.as_deref(), Some(DEFAULT_CONDITION));
        assert_eq!(fields.status.as_deref(), Some(STATUS_AVAILABLE));
        assert!(fields.vendor_id.is_none());
    }

    #[test]
    fn test_create_requires_name_and_serial() {
        let errors = field_errors(item_fields(&form(&[("description", "x")]), true).unwrap_err());
        assert!(errors.contains_key("item_name"));
        assert!(errors.contains_key("serial_id"));
    }

    #[test]
    fn test_update_is_partial() {
        let fields = item_fields(&form(&[("location", "Shelf 3")]), false).unwrap();
        assert_eq!(fields.location.as_deref(), Some("Shelf 3"));
        assert!(fields.item_name.is_none());
        assert!(fields.condition.is_none());
        assert!(fields.status.is_none());
    }

    #[test]
    fn test_field_rules() {
        let long_serial = "s".repeat(101);
        let long_description = "d".repeat(1001);
        let errors = field_errors(
            item_fields(
                &form(&[
                    ("item_name", "Drill"),
                    ("serial_id", &long_serial),
                    ("description", &long_description),
                    ("vendor_id", "vendor-1"),
                    ("assigned_to", "nobody"),
                    ("purchase_date", "12/01/2024"),
                    ("status", "lost"),
                ]),
                true,
            )
            .unwrap_err(),
        );
        for key in ["serial_id", "description", "vendor_id", "assigned_to", "purchase_date", "status"] {
            assert!(errors.contains_key(key), "missing error for {}", key);
        }
        assert!(!errors.contains_key("item_name"));
    }

    #[test]
    fn test_typed_values_parse() {
        let vendor = Uuid::new_v4();
        let fields = item_fields(
            &form(&[
                ("item_name", "Drill"),
                ("serial_id", "S-1"),
                ("vendor_id", &vendor.to_string()),
                ("purchase_date", "2024-03-15"),
            ]),
            true,
        )
        .unwrap();
        assert_eq!(fields.vendor_id, Some(vendor));
        assert_eq!(fields.purchase_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }
}
