use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::validation::{is_valid_email, normalize_email};
use crate::scheme::schema::{FieldDef, FieldKind, FieldRule, ModelSchema};

/// Errors that can occur while turning API input into a Record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Missing primary key: {0}")]
    MissingPrimaryKey(String),
    #[error("Validation failed for {} field(s)", .0.len())]
    Invalid(HashMap<String, String>),
}

/// How input is interpreted against the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// New row: required fields must be present
    Create,
    /// Only the given fields change
    Patch,
    /// Full replacement: required fields must be present, omitted ones become null
    Replace,
}

/// One column assignment, already rendered as text for a `$n::<type>` bind
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: String,
    pub sql_type: &'static str,
    pub value: Option<String>,
    pub secret: bool,
}

/// A validated set of column assignments for one model row
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Primary key value for Patch/Replace
    pub key: Option<String>,
    pub values: Vec<ColumnValue>,
}

impl Record {
    /// Validate a JSON body against `schema`
    pub fn from_input(schema: &ModelSchema, input: &Value, op: Operation) -> Result<Self, RecordError> {
        let obj = input
            .as_object()
            .ok_or_else(|| RecordError::InvalidJson("Expected JSON object".to_string()))?;
        Self::from_map(schema, obj, op)
    }

    pub fn from_map(schema: &ModelSchema, obj: &Map<String, Value>, op: Operation) -> Result<Self, RecordError> {
        let mut errors = HashMap::new();
        let mut record = Record::default();

        if op != Operation::Create {
            let key = obj
                .get(schema.primary_key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| RecordError::MissingPrimaryKey(schema.primary_key.to_string()))?;
            match schema.primary_field().map(|f| coerce(f, key)) {
                Some(Ok(Some(text))) => record.key = Some(text),
                Some(Err(message)) => {
                    errors.insert(schema.primary_key.to_string(), message);
                }
                _ => return Err(RecordError::MissingPrimaryKey(schema.primary_key.to_string())),
            }
        }

        for (key, value) in obj {
            if op != Operation::Create && key == schema.primary_key {
                continue;
            }
            let Some(field) = schema.field(key) else {
                errors.insert(key.clone(), "Unknown field".to_string());
                continue;
            };
            if field.system {
                errors.insert(key.clone(), "System field cannot be set".to_string());
                continue;
            }

            match coerce(field, value).and_then(|text| text.map(|t| apply_rule(field, t)).transpose()) {
                Ok(None) if field.required => {
                    errors.insert(key.clone(), "This field is required".to_string());
                }
                Ok(text) => record.values.push(ColumnValue {
                    column: field.name.to_string(),
                    sql_type: field.kind.sql_type(),
                    value: text,
                    secret: field.secret,
                }),
                Err(message) => {
                    errors.insert(key.clone(), message);
                }
            }
        }

        if op != Operation::Patch {
            for field in schema.input_fields() {
                if obj.contains_key(field.name) {
                    continue;
                }
                if field.required {
                    errors.insert(field.name.to_string(), "This field is required".to_string());
                } else if op == Operation::Replace {
                    record.values.push(ColumnValue {
                        column: field.name.to_string(),
                        sql_type: field.kind.sql_type(),
                        value: None,
                        secret: field.secret,
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(RecordError::Invalid(errors));
        }

        Ok(record)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values.iter().find(|v| v.column == column)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace secret column values using `hash`
    pub fn hash_secrets<E>(&mut self, hash: impl Fn(&str) -> Result<String, E>) -> Result<(), E> {
        for value in self.values.iter_mut().filter(|v| v.secret) {
            if let Some(plain) = value.value.as_deref() {
                value.value = Some(hash(plain)?);
            }
        }
        Ok(())
    }
}

/// Render a JSON input value as the text form Postgres accepts for the field's type.
/// `Ok(None)` means SQL NULL; blank strings count as null.
pub fn coerce(field: &FieldDef, value: &Value) -> Result<Option<String>, String> {
    if value.is_null() {
        return Ok(None);
    }
    if let Value::String(s) = value {
        if s.trim().is_empty() && field.kind != FieldKind::Json {
            return Ok(None);
        }
    }

    let text = match field.kind {
        FieldKind::Text => match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err("Must be a string".to_string()),
        },
        FieldKind::Uuid => {
            let raw = value.as_str().ok_or("Must be a UUID")?;
            Uuid::parse_str(raw.trim())
                .map_err(|_| "Must be a UUID".to_string())?
                .to_string()
        }
        FieldKind::Integer => match value {
            Value::Number(n) => n.as_i64().ok_or("Must be an integer")?.to_string(),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| "Must be an integer".to_string())?
                .to_string(),
            _ => return Err("Must be an integer".to_string()),
        },
        FieldKind::Boolean => match value {
            Value::Bool(b) => b.to_string(),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => "true".to_string(),
                "false" | "0" | "no" => "false".to_string(),
                _ => return Err("Must be a boolean".to_string()),
            },
            _ => return Err("Must be a boolean".to_string()),
        },
        FieldKind::Date => {
            let raw = value.as_str().ok_or("Must be a date (YYYY-MM-DD)")?;
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| "Must be a date (YYYY-MM-DD)".to_string())?
                .format("%Y-%m-%d")
                .to_string()
        }
        FieldKind::Timestamp => {
            let raw = value.as_str().ok_or("Must be an RFC 3339 timestamp")?;
            DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|_| "Must be an RFC 3339 timestamp".to_string())?
                .to_rfc3339()
        }
        FieldKind::Json => match value {
            // CSV cells and form fields carry JSON as text
            Value::String(s) => {
                let parsed: Value = serde_json::from_str(s).map_err(|_| "Must be valid JSON".to_string())?;
                parsed.to_string()
            }
            other => other.to_string(),
        },
    };

    if let Some(max) = field.max_length {
        if field.kind == FieldKind::Text && text.chars().count() > max {
            return Err(format!("Must be at most {} characters", max));
        }
    }

    Ok(Some(text))
}

/// Normalize and check coerced input against the field's content rule
pub fn apply_rule(field: &FieldDef, text: String) -> Result<String, String> {
    match field.rule {
        None => Ok(text),
        Some(FieldRule::Email) => {
            let email = normalize_email(&text);
            if is_valid_email(&email) {
                Ok(email)
            } else {
                Err("Invalid email format".to_string())
            }
        }
        Some(FieldRule::Password) => {
            password::validate_strength(&text).map_err(|e| e.to_string())?;
            Ok(text)
        }
        Some(FieldRule::OneOf(allowed)) => {
            if allowed.contains(&text.as_str()) {
                Ok(text)
            } else {
                Err(format!("Must be one of: {}", allowed.join(", ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::schema::fixtures::gadget;
    use serde_json::json;

    fn errors_of(result: Result<Record, RecordError>) -> HashMap<String, String> {
        match result {
            Err(RecordError::Invalid(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_create_valid_record() {
        let schema = gadget();
        let input = json!({
            "name": "Drill",
            "serial": "SN-1",
            "quantity": "3",
            "active": true,
            "bought_on": "2024-02-29",
            "extra": {"color": "red"}
        });
        let record = Record::from_input(&schema, &input, Operation::Create).unwrap();
        assert_eq!(record.get("quantity").unwrap().value.as_deref(), Some("3"));
        assert_eq!(record.get("quantity").unwrap().sql_type, "bigint");
        assert_eq!(record.get("active").unwrap().value.as_deref(), Some("true"));
        assert_eq!(record.get("extra").unwrap().value.as_deref(), Some(r#"{"color":"red"}"#));
        // optional omitted fields are left untouched on create
        assert!(record.get("owner_id").is_none());
    }

    #[test]
    fn test_create_reports_every_problem() {
        let schema = gadget();
        let input = json!({
            "name": "a name that is definitely too long",
            "owner_id": "not-a-uuid",
            "bought_on": "02/29/2024",
            "color": "red",
            "gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a",
            "org_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a"
        });
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Create));
        assert_eq!(errors["name"], "Must be at most 20 characters");
        assert_eq!(errors["owner_id"], "Must be a UUID");
        assert_eq!(errors["bought_on"], "Must be a date (YYYY-MM-DD)");
        assert_eq!(errors["color"], "Unknown field");
        assert_eq!(errors["gadget_id"], "System field cannot be set");
        assert_eq!(errors["org_id"], "System field cannot be set");
        assert_eq!(errors["serial"], "This field is required");
    }

    #[test]
    fn test_blank_required_is_missing() {
        let schema = gadget();
        let input = json!({"name": "  ", "serial": "SN-1"});
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Create));
        assert_eq!(errors["name"], "This field is required");
    }

    #[test]
    fn test_patch_requires_primary_key() {
        let schema = gadget();
        let result = Record::from_input(&schema, &json!({"name": "Saw"}), Operation::Patch);
        assert!(matches!(result, Err(RecordError::MissingPrimaryKey(k)) if k == "gadget_id"));
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let schema = gadget();
        let input = json!({"gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "quantity": 7});
        let record = Record::from_input(&schema, &input, Operation::Patch).unwrap();
        assert_eq!(record.key.as_deref(), Some("3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a"));
        assert_eq!(record.values.len(), 1);
    }

    #[test]
    fn test_replace_nulls_omitted_optional_fields() {
        let schema = gadget();
        let input = json!({
            "gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a",
            "name": "Saw",
            "serial": "SN-2"
        });
        let record = Record::from_input(&schema, &input, Operation::Replace).unwrap();
        assert_eq!(record.get("quantity").unwrap().value, None);
        assert_eq!(record.get("owner_id").unwrap().value, None);
        assert!(record.get("gadget_id").is_none());
        assert!(record.get("created_at").is_none());
    }

    #[test]
    fn test_replace_requires_required_fields() {
        let schema = gadget();
        let input = json!({"gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "name": "Saw"});
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Replace));
        assert!(errors.contains_key("serial"));
    }

    #[test]
    fn test_non_object_input() {
        let schema = gadget();
        let result = Record::from_input(&schema, &json!([1, 2]), Operation::Create);
        assert!(matches!(result, Err(RecordError::InvalidJson(_))));
    }

    #[test]
    fn test_hash_secrets() {
        let schema = gadget();
        let input = json!({"name": "Drill", "serial": "SN-1", "pin": "Gadget#2024"});
        let mut record = Record::from_input(&schema, &input, Operation::Create).unwrap();
        record
            .hash_secrets(|plain| Ok::<_, ()>(format!("hashed:{}", plain)))
            .unwrap();
        assert_eq!(record.get("pin").unwrap().value.as_deref(), Some("hashed:Gadget#2024"));
        assert_eq!(record.get("name").unwrap().value.as_deref(), Some("Drill"));
    }

    #[test]
    fn test_email_rule_normalizes_and_checks() {
        let schema = gadget();
        let input = json!({"name": "Drill", "serial": "SN-1", "contact": "  Ada@Example.COM "});
        let record = Record::from_input(&schema, &input, Operation::Create).unwrap();
        assert_eq!(record.get("contact").unwrap().value.as_deref(), Some("ada@example.com"));

        let input = json!({"name": "Drill", "serial": "SN-1", "contact": "NOT AN EMAIL @ X"});
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Create));
        assert_eq!(errors["contact"], "Invalid email format");
    }

    #[test]
    fn test_password_rule_enforces_policy() {
        let schema = gadget();
        let input = json!({"name": "Drill", "serial": "SN-1", "pin": "a"});
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Create));
        assert_eq!(errors["pin"], password::POLICY_MESSAGE);
    }

    #[test]
    fn test_one_of_rule() {
        let schema = gadget();
        let input = json!({"gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "state": "broken"});
        let errors = errors_of(Record::from_input(&schema, &input, Operation::Patch));
        assert_eq!(errors["state"], "Must be one of: new, used");

        let input = json!({"gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "state": "used"});
        assert!(Record::from_input(&schema, &input, Operation::Patch).is_ok());
    }

    #[test]
    fn test_rules_skip_null_values() {
        let schema = gadget();
        let input = json!({"gadget_id": "3f1c2a9e-8f1b-4c1a-9a51-6f9c2d1e0b7a", "state": null, "contact": ""});
        let record = Record::from_input(&schema, &input, Operation::Patch).unwrap();
        assert_eq!(record.get("state").unwrap().value, None);
        assert_eq!(record.get("contact").unwrap().value, None);
    }
}
