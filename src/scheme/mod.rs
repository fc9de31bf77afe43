//! Model-agnostic engine behind the `/scheme` routes. Every operation takes a
//! registered model name, resolves its [`ModelSchema`] and works against a
//! tenant-scoped [`DynamicRepository`].

pub mod crud;
pub mod csv;
pub mod list;
pub mod pdf;
pub mod postman;
pub mod registry;
pub mod relax;
pub mod schema;
pub mod search;

use uuid::Uuid;

use crate::auth::password::PasswordError;
use crate::database::record::RecordError;
use crate::database::{DatabaseError, DatabaseManager, DynamicRepository};
use crate::filter::FilterError;
use crate::storage::StorageError;

pub use registry::lookup;
pub use schema::{FieldDef, FieldKind, ModelSchema};

#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("Model '{0}' not found")]
    UnknownModel(String),
    #[error("Model '{0}' is read-only")]
    ReadOnly(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Invalid CSV: {0}")]
    Csv(#[from] ::csv::Error),
}

impl From<sqlx::Error> for SchemeError {
    fn from(err: sqlx::Error) -> Self {
        SchemeError::Database(DatabaseError::Sqlx(err))
    }
}

/// Resolve `model` and open a repository scoped to `org_id`
pub async fn open(model: &str, org_id: Uuid) -> Result<DynamicRepository<'static>, SchemeError> {
    let schema = lookup(model)?;
    let pool = DatabaseManager::main_pool().await?;
    Ok(DynamicRepository::new(schema, pool, org_id))
}

/// Fail unless clients may write to `schema`
pub fn ensure_writable(schema: &ModelSchema) -> Result<(), SchemeError> {
    if schema.writable {
        Ok(())
    } else {
        Err(SchemeError::ReadOnly(schema.name.to_string()))
    }
}

/// Validate a primary key supplied as text (query string, multipart field)
pub fn parse_key(schema: &ModelSchema, raw: &str) -> Result<String, SchemeError> {
    let field = schema
        .primary_field()
        .ok_or_else(|| SchemeError::BadRequest(format!("Model '{}' has no primary key", schema.name)))?;
    match crate::database::record::coerce(field, &serde_json::Value::String(raw.to_string())) {
        Ok(Some(key)) => Ok(key),
        Ok(None) => Err(SchemeError::BadRequest(format!("'{}' is required", schema.primary_key))),
        Err(message) => Err(SchemeError::BadRequest(format!("{}: {}", schema.primary_key, message))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::schema::fixtures::gadget;

    #[test]
    fn test_parse_key() {
        let schema = gadget();
        let id = Uuid::new_v4();
        assert_eq!(parse_key(&schema, &id.to_string()).unwrap(), id.to_string());
        assert!(matches!(parse_key(&schema, "not-a-uuid"), Err(SchemeError::BadRequest(_))));
        assert!(matches!(parse_key(&schema, "  "), Err(SchemeError::BadRequest(_))));
    }

    #[test]
    fn test_read_only_models() {
        let schema = lookup("permission").unwrap();
        assert!(matches!(ensure_writable(schema), Err(SchemeError::ReadOnly(name)) if name == "permission"));
        assert!(ensure_writable(lookup("item").unwrap()).is_ok());
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(lookup("spaceship"), Err(SchemeError::UnknownModel(_))));
    }
}
