use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SqlResult};
use crate::scheme::schema::ModelSchema;

/// Query builder for one registered model. Column names are checked against
/// the schema and rows are restricted to the tenant when one is set.
pub struct Filter<'s> {
    schema: &'s ModelSchema,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    tenant: Option<Uuid>,
}

impl<'s> Filter<'s> {
    pub fn new(schema: &'s ModelSchema) -> Self {
        Self {
            schema,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            tenant: None,
        }
    }

    /// Restrict every generated statement to one organization's rows.
    /// Models without a tenant column are shared and ignore this.
    pub fn scope_to_tenant(&mut self, org_id: Uuid) -> &mut Self {
        self.tenant = Some(org_id);
        self
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column == "*" { continue; }
            match self.schema.field(column) {
                Some(field) if !field.hidden => {}
                _ => return Err(FilterError::UnknownField(format!("'{}' is not a field of {}", column, self.schema.name))),
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        // columns and value types are checked now, not when the SQL is built
        FilterWhere::new(self.schema).conditions(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(self.schema, &order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::Paging("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::Paging("Offset must be non-negative".to_string())); } }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn applied_limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let (where_clause, params) = self.build_where()?;

        let order_data = if self.order_data.is_empty() {
            FilterOrder::validate_and_parse(self.schema, &Value::String(self.schema.default_order.to_string()))?
        } else {
            self.order_data.clone()
        };
        let order_clause = FilterOrder::generate(&order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.schema.table),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    /// Same statement wrapped so each row comes back as one JSON object
    pub fn to_json_sql(&self) -> Result<SqlResult, FilterError> {
        let inner = self.to_sql()?;
        Ok(SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.build_where()?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.schema.table)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.schema.table, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    fn build_where(&self) -> Result<(String, Vec<Option<String>>), FilterError> {
        let mut filter_where = FilterWhere::new(self.schema);
        let mut conditions = match &self.where_data {
            Some(where_data) => filter_where.conditions(where_data)?,
            None => vec![],
        };

        if let (Some(column), Some(org_id)) = (self.schema.tenant_column, self.tenant) {
            let placeholder = filter_where.push_param(Some(org_id.to_string()), "uuid");
            conditions.push(format!("\"{}\" = {}", column, placeholder));
        }

        Ok((conditions.join(" AND "), filter_where.into_params()))
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            // hidden columns are never selected
            self.schema
                .visible_fields()
                .map(|f| format!("\"{}\"", f.name))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::schema::fixtures::gadget;
    use serde_json::json;

    #[test]
    fn test_tenant_scope_is_appended() {
        let schema = gadget();
        let org = Uuid::new_v4();
        let mut filter = Filter::new(&schema);
        filter.scope_to_tenant(org).where_clause(json!({"name": "Drill"})).unwrap();

        let sql = filter.to_sql().unwrap();
        assert!(sql.query.contains("WHERE \"name\" = $1::text AND \"org_id\" = $2::uuid"));
        assert_eq!(sql.params, vec![Some("Drill".to_string()), Some(org.to_string())]);
    }

    #[test]
    fn test_hidden_columns_not_selected() {
        let schema = gadget();
        let sql = Filter::new(&schema).to_sql().unwrap();
        assert!(sql.query.starts_with("SELECT \"gadget_id\", \"org_id\", \"name\""));
        assert!(!sql.query.contains("\"pin\""));
        assert!(sql.query.contains("FROM \"gadgets\""));
    }

    #[test]
    fn test_default_order_applied() {
        let schema = gadget();
        let sql = Filter::new(&schema).to_sql().unwrap();
        assert!(sql.query.ends_with("ORDER BY \"created_at\" DESC"));
    }

    #[test]
    fn test_select_where_order_and_paging() {
        let schema = gadget();
        let mut filter = Filter::new(&schema);
        filter
            .select(vec!["name".into(), "serial".into()])
            .unwrap()
            .where_clause(json!({"quantity": {"$gte": 2}}))
            .unwrap()
            .order(json!("name asc"))
            .unwrap()
            .limit(10, Some(20))
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"name\", \"serial\" FROM \"gadgets\" WHERE \"quantity\" >= $1::bigint ORDER BY \"name\" ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_limit_is_capped() {
        let schema = gadget();
        let max = crate::config::CONFIG.filter.max_limit.unwrap_or(i64::MAX);
        let mut filter = Filter::new(&schema);
        filter.limit(i64::MAX, None).unwrap();
        assert_eq!(filter.applied_limit(), Some(max));
        assert!(Filter::new(&schema).limit(-1, None).is_err());
        assert!(Filter::new(&schema).limit(1, Some(-1)).is_err());
    }

    #[test]
    fn test_count_sql_shares_where() {
        let schema = gadget();
        let org = Uuid::new_v4();
        let mut filter = Filter::new(&schema);
        filter.scope_to_tenant(org);
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"gadgets\" WHERE \"org_id\" = $1::uuid");
    }

    #[test]
    fn test_json_wrapper() {
        let schema = gadget();
        let sql = Filter::new(&schema).to_json_sql().unwrap();
        assert!(sql.query.starts_with("SELECT row_to_json(t) AS row FROM (SELECT "));
        assert!(sql.query.ends_with(") t"));
    }

    #[test]
    fn test_select_rejects_unknown() {
        let schema = gadget();
        assert!(Filter::new(&schema).select(vec!["color".into()]).is_err());
    }
}
