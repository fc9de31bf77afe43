use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::FilterOp;
use crate::database::record::coerce;
use crate::scheme::schema::{FieldDef, ModelSchema};

/// Builds a WHERE clause for one model. Parameters are numbered from 1 in the
/// order they are pushed, so one instance must build the whole clause.
pub struct FilterWhere<'s> {
    schema: &'s ModelSchema,
    params: Vec<Option<String>>,
}

impl<'s> FilterWhere<'s> {
    pub fn new(schema: &'s ModelSchema) -> Self {
        Self { schema, params: vec![] }
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidCondition("WHERE must be an object".to_string())),
        }
    }

    /// Conditions for `where_data`, to be joined with AND
    pub fn conditions(&mut self, where_data: &Value) -> Result<Vec<String>, FilterError> {
        match where_data {
            Value::Null => Ok(vec![]),
            Value::Object(obj) => self.parse_object(obj),
            _ => Err(FilterError::InvalidCondition("Unsupported WHERE format".to_string())),
        }
    }

    /// Bind a value and return its placeholder with an explicit cast
    pub fn push_param(&mut self, value: Option<String>, sql_type: &str) -> String {
        self.params.push(value);
        format!("${}::{}", self.params.len(), sql_type)
    }

    pub fn into_params(self) -> Vec<Option<String>> {
        self.params
    }

    fn parse_object(&mut self, obj: &Map<String, Value>) -> Result<Vec<String>, FilterError> {
        let mut out = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                out.push(self.parse_logical_operator(key, value)?);
            } else {
                out.extend(self.parse_field_condition(key, value)?);
            }
        }
        Ok(out)
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperand(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut parts = Vec::new();
                for v in arr {
                    let obj = v.as_object().ok_or_else(|| {
                        FilterError::InvalidOperand(format!("{} entries must be objects", op))
                    })?;
                    parts.push(Self::wrap(self.parse_object(obj)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| FilterError::InvalidOperand("$not requires object".to_string()))?;
                Ok(format!("NOT {}", Self::wrap(self.parse_object(obj)?)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn wrap(conditions: Vec<String>) -> String {
        if conditions.is_empty() {
            "(1=1)".to_string()
        } else {
            format!("({})", conditions.join(" AND "))
        }
    }

    fn resolve(&self, column: &str) -> Result<&'s FieldDef, FilterError> {
        let schema: &'s ModelSchema = self.schema;
        match schema.field(column) {
            Some(field) if !field.hidden => Ok(field),
            _ => Err(FilterError::UnknownField(format!(
                "'{}' is not a field of {}",
                column, schema.name
            ))),
        }
    }

    fn parse_field_condition(&mut self, column: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        let field = self.resolve(column)?;
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                let mut out = Vec::new();
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.build_condition(field, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.build_condition(field, FilterOp::Eq, value)?]),
        }
    }

    fn typed_param(&mut self, field: &FieldDef, value: &Value) -> Result<String, FilterError> {
        let text = coerce(field, value)
            .map_err(|msg| FilterError::InvalidOperand(format!("{}: {}", field.name, msg)))?;
        Ok(self.push_param(text, field.kind.sql_type()))
    }

    fn build_condition(&mut self, field: &FieldDef, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", field.name);
        match operator {
            FilterOp::Eq | FilterOp::Ne if data.is_null() => Ok(format!(
                "{} IS {}NULL",
                quoted_column,
                if operator == FilterOp::Ne { "NOT " } else { "" }
            )),
            FilterOp::Eq | FilterOp::Ne | FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let sql_op = operator.comparison().unwrap_or("=");
                let placeholder = self.typed_param(field, data)?;
                Ok(format!("{} {} {}", quoted_column, sql_op, placeholder))
            }
            FilterOp::Like | FilterOp::ILike => {
                let pattern = match data {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(FilterError::InvalidOperand(
                            "$like/$ilike require a string pattern".to_string(),
                        ))
                    }
                };
                let keyword = if operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let placeholder = self.push_param(Some(pattern), "text");
                Ok(format!("{}::text {} {}", quoted_column, keyword, placeholder))
            }
            FilterOp::In => {
                if let Value::Array(values) = data {
                    if values.is_empty() {
                        return Ok("1=0".to_string());
                    }
                    let placeholders = values
                        .iter()
                        .map(|v| self.typed_param(field, v))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(format!("{} IN ({})", quoted_column, placeholders.join(", ")))
                } else {
                    self.build_condition(field, FilterOp::Eq, data)
                }
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.typed_param(field, &values[0])?;
                    let high = self.typed_param(field, &values[1])?;
                    Ok(format!("{} BETWEEN {} AND {}", quoted_column, low, high))
                }
                _ => Err(FilterError::InvalidOperand(
                    "$between requires array with 2 values".to_string(),
                )),
            },
        }
    }
}
