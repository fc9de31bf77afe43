use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};
use crate::scheme::schema::ModelSchema;

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(schema: &ModelSchema, order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::Null => vec![],
            Value::String(s) => Self::parse_order_string(s)?,
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        _ => {
                            return Err(FilterError::InvalidOperand(
                                "order entries must be strings".to_string(),
                            ))
                        }
                    }
                }
                out
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    out.push(FilterOrderInfo {
                        column: k.clone(),
                        sort: Self::parse_direction(v.as_str().unwrap_or("asc"))?,
                    });
                }
                out
            }
            _ => {
                return Err(FilterError::InvalidOperand(
                    "order must be a string, array or object".to_string(),
                ))
            }
        };

        for info in &infos {
            match schema.field(&info.column) {
                Some(field) if !field.hidden => {}
                _ => {
                    return Err(FilterError::UnknownField(format!(
                        "cannot order {} by '{}'",
                        schema.name, info.column
                    )))
                }
            }
        }

        Ok(infos)
    }

    fn parse_direction(dir: &str) -> Result<SortDirection, FilterError> {
        if dir.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else if dir.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else {
            Err(FilterError::InvalidOperand(format!("unknown sort direction '{}'", dir)))
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::parse_direction(it.next().unwrap_or("asc"))?;
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::schema::fixtures::gadget;
    use serde_json::json;

    #[test]
    fn test_order_forms() {
        let schema = gadget();
        let from_string = FilterOrder::validate_and_parse(&schema, &json!("name desc, quantity")).unwrap();
        assert_eq!(FilterOrder::generate(&from_string), "ORDER BY \"name\" DESC, \"quantity\" ASC");

        let from_array = FilterOrder::validate_and_parse(&schema, &json!(["created_at desc"])).unwrap();
        assert_eq!(FilterOrder::generate(&from_array), "ORDER BY \"created_at\" DESC");

        let from_object = FilterOrder::validate_and_parse(&schema, &json!({"serial": "asc"})).unwrap();
        assert_eq!(FilterOrder::generate(&from_object), "ORDER BY \"serial\" ASC");
    }

    #[test]
    fn test_order_rejects_unknown_columns_and_directions() {
        let schema = gadget();
        assert!(FilterOrder::validate_and_parse(&schema, &json!("color")).is_err());
        assert!(FilterOrder::validate_and_parse(&schema, &json!("pin desc")).is_err());
        assert!(FilterOrder::validate_and_parse(&schema, &json!("name sideways")).is_err());
        assert!(FilterOrder::validate_and_parse(&schema, &json!("name; DROP TABLE gadgets")).is_err());
    }
}
