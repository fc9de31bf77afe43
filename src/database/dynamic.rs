//! Repository for registered models. Statements are generated from the model
//! schema; every value is bound as text and cast in SQL.

use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres, Row};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, QueryTimer};
use crate::database::record::Record;
use crate::filter::types::SqlResult;
use crate::filter::Filter;
use crate::scheme::schema::{ModelSchema, Reference};

pub struct DynamicRepository<'s> {
    schema: &'s ModelSchema,
    pool: PgPool,
    tenant: Option<Uuid>,
}

impl<'s> DynamicRepository<'s> {
    pub fn new(schema: &'s ModelSchema, pool: PgPool, tenant: Uuid) -> Self {
        Self { schema, pool, tenant: Some(tenant) }
    }

    pub fn schema(&self) -> &'s ModelSchema {
        self.schema
    }

    /// A Filter for this model, already scoped to the tenant
    pub fn filter(&self) -> Filter<'s> {
        let mut filter = Filter::new(self.schema);
        if let Some(org_id) = self.tenant {
            filter.scope_to_tenant(org_id);
        }
        filter
    }

    /// Select records matching `filter`, returning JSON maps without hidden fields.
    pub async fn select_filter(&self, filter: &Filter<'_>) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let sql = filter.to_json_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        self.fetch_rows(&sql).await
    }

    pub async fn count_filter(&self, filter: &Filter<'_>) -> Result<i64, DatabaseError> {
        let sql = filter.to_count_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let timer = QueryTimer::start(&sql.query);
        let row = bind_text(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        timer.finish();
        Ok(row.try_get::<i64, _>("count")?)
    }

    pub async fn select_by_key(&self, key: &str) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let sql = select_by_key_sql(self.schema, key, self.tenant);
        Ok(self.fetch_rows(&sql).await?.into_iter().next())
    }

    pub async fn insert(&self, record: &Record) -> Result<Map<String, Value>, DatabaseError> {
        self.check_references(record).await?;
        let sql = insert_sql(self.schema, record, self.tenant);
        self.fetch_rows(&sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError("INSERT returned no row".to_string()))
    }

    /// Apply `record` to the row identified by its key; `None` when no row matched
    pub async fn update(&self, key: &str, record: &Record) -> Result<Option<Map<String, Value>>, DatabaseError> {
        self.check_references(record).await?;
        match update_sql(self.schema, key, record, self.tenant) {
            Some(sql) => Ok(self.fetch_rows(&sql).await?.into_iter().next()),
            None => self.select_by_key(key).await,
        }
    }

    /// Every reference column being set must name a row of the same tenant
    async fn check_references(&self, record: &Record) -> Result<(), DatabaseError> {
        for value in &record.values {
            let (Some(field), Some(id)) = (self.schema.field(&value.column), value.value.as_deref()) else {
                continue;
            };
            let Some(reference) = field.references else {
                continue;
            };

            let sql = reference_sql(&reference, id, self.tenant);
            let timer = QueryTimer::start(&sql.query);
            let exists: bool = bind_text(sqlx::query(&sql.query), &sql.params)
                .fetch_one(&self.pool)
                .await?
                .try_get("found")?;
            timer.finish();

            if !exists {
                return Err(DatabaseError::InvalidReference {
                    field: field.name.to_string(),
                    message: format!("{} not found in this organization", field.label),
                });
            }
        }
        Ok(())
    }

    async fn fetch_rows(&self, sql: &SqlResult) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let timer = QueryTimer::start(&sql.query);
        let rows = bind_text(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        timer.finish();

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if let Value::Object(map) = row.try_get::<Value, _>("row")? {
                out.push(self.schema.redact(map));
            }
        }
        Ok(out)
    }
}

/// Bind each text parameter in order
pub fn bind_text<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &'q [Option<String>],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        q = q.bind(p.as_deref());
    }
    q
}

fn returning_columns(schema: &ModelSchema) -> String {
    schema
        .visible_fields()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_type(schema: &ModelSchema) -> &'static str {
    schema.primary_field().map(|f| f.kind.sql_type()).unwrap_or("text")
}

fn tenant_condition(schema: &ModelSchema, tenant: Option<Uuid>, params: &mut Vec<Option<String>>) -> String {
    match (schema.tenant_column, tenant) {
        (Some(column), Some(org_id)) => {
            params.push(Some(org_id.to_string()));
            format!(" AND \"{}\" = ${}::uuid", column, params.len())
        }
        _ => String::new(),
    }
}

/// Existence check for a referenced row; referenced tables carry `org_id`
pub fn reference_sql(reference: &Reference, id: &str, tenant: Option<Uuid>) -> SqlResult {
    let mut params = vec![Some(id.to_string())];
    let mut query = format!(
        "SELECT EXISTS (SELECT 1 FROM \"{}\" WHERE \"{}\" = $1::uuid",
        reference.table, reference.key
    );
    if let Some(org_id) = tenant {
        params.push(Some(org_id.to_string()));
        query.push_str(" AND \"org_id\" = $2::uuid");
    }
    query.push_str(") AS found");
    SqlResult { query, params }
}

pub fn select_by_key_sql(schema: &ModelSchema, key: &str, tenant: Option<Uuid>) -> SqlResult {
    let mut params = vec![Some(key.to_string())];
    let tenant_clause = tenant_condition(schema, tenant, &mut params);
    let query = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT {} FROM \"{}\" WHERE \"{}\" = $1::{}{}) t",
        returning_columns(schema),
        schema.table,
        schema.primary_key,
        key_type(schema),
        tenant_clause
    );
    SqlResult { query, params }
}

pub fn insert_sql(schema: &ModelSchema, record: &Record, tenant: Option<Uuid>) -> SqlResult {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();

    for value in &record.values {
        params.push(value.value.clone());
        columns.push(format!("\"{}\"", value.column));
        placeholders.push(format!("${}::{}", params.len(), value.sql_type));
    }
    if let (Some(column), Some(org_id)) = (schema.tenant_column, tenant) {
        params.push(Some(org_id.to_string()));
        columns.push(format!("\"{}\"", column));
        placeholders.push(format!("${}::uuid", params.len()));
    }

    let insert = if columns.is_empty() {
        format!("INSERT INTO \"{}\" DEFAULT VALUES", schema.table)
    } else {
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    SqlResult {
        query: format!(
            "WITH t AS ({} RETURNING {}) SELECT row_to_json(t) AS row FROM t",
            insert,
            returning_columns(schema)
        ),
        params,
    }
}

/// `None` when there is nothing to set
pub fn update_sql(schema: &ModelSchema, key: &str, record: &Record, tenant: Option<Uuid>) -> Option<SqlResult> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for value in &record.values {
        params.push(value.value.clone());
        assignments.push(format!("\"{}\" = ${}::{}", value.column, params.len(), value.sql_type));
    }
    if assignments.is_empty() {
        return None;
    }
    if let Some(touch) = schema.touch_column {
        assignments.push(format!("\"{}\" = now()", touch));
    }

    params.push(Some(key.to_string()));
    let key_placeholder = format!("${}::{}", params.len(), key_type(schema));
    let tenant_clause = tenant_condition(schema, tenant, &mut params);

    Some(SqlResult {
        query: format!(
            "WITH t AS (UPDATE \"{}\" SET {} WHERE \"{}\" = {}{} RETURNING {}) SELECT row_to_json(t) AS row FROM t",
            schema.table,
            assignments.join(", "),
            schema.primary_key,
            key_placeholder,
            tenant_clause,
            returning_columns(schema)
        ),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::Operation;
    use crate::scheme::schema::fixtures::gadget;
    use serde_json::json;

    #[test]
    fn test_insert_sql_forces_tenant() {
        let schema = gadget();
        let org = Uuid::new_v4();
        let record = Record::from_input(&schema, &json!({"name": "Drill", "serial": "S1"}), Operation::Create).unwrap();
        let sql = insert_sql(&schema, &record, Some(org));

        assert!(sql.query.starts_with("WITH t AS (INSERT INTO \"gadgets\" ("));
        assert!(sql.query.contains("\"org_id\""));
        assert!(sql.query.contains("$3::uuid"));
        assert!(!sql.query.contains("\"pin\""), "hidden columns are not returned");
        assert_eq!(sql.params.last().unwrap().as_deref(), Some(org.to_string().as_str()));
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn test_update_sql_touches_and_scopes() {
        let schema = gadget();
        let org = Uuid::new_v4();
        let key = Uuid::new_v4().to_string();
        let record = Record::from_input(
            &schema,
            &json!({"gadget_id": key, "quantity": 4}),
            Operation::Patch,
        )
        .unwrap();
        let sql = update_sql(&schema, &key, &record, Some(org)).unwrap();

        assert!(sql.query.contains("SET \"quantity\" = $1::bigint, \"updated_at\" = now()"));
        assert!(sql.query.contains("WHERE \"gadget_id\" = $2::uuid AND \"org_id\" = $3::uuid"));
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn test_update_sql_empty_record() {
        let schema = gadget();
        assert!(update_sql(&schema, "k", &Record::default(), None).is_none());
    }

    #[test]
    fn test_select_by_key_sql() {
        let schema = gadget();
        let sql = select_by_key_sql(&schema, "abc", None);
        assert!(sql.query.contains("WHERE \"gadget_id\" = $1::uuid) t"));
        assert_eq!(sql.params, vec![Some("abc".to_string())]);
    }

    #[test]
    fn test_reference_sql_is_tenant_scoped() {
        let org = Uuid::new_v4();
        let reference = Reference { table: "vendors", key: "vendor_id" };
        let sql = reference_sql(&reference, "abc", Some(org));
        assert_eq!(
            sql.query,
            "SELECT EXISTS (SELECT 1 FROM \"vendors\" WHERE \"vendor_id\" = $1::uuid AND \"org_id\" = $2::uuid) AS found"
        );
        assert_eq!(sql.params, vec![Some("abc".to_string()), Some(org.to_string())]);
    }
}
