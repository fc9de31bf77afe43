use serde_json::{Map, Value};

use super::{ensure_writable, parse_key, SchemeError};
use crate::auth::password;
use crate::database::record::{Operation, Record};
use crate::database::DynamicRepository;

type Row = Map<String, Value>;

pub async fn create(repo: &DynamicRepository<'_>, body: &Value) -> Result<Row, SchemeError> {
    let schema = repo.schema();
    ensure_writable(schema)?;
    if !schema.creatable {
        return Err(SchemeError::BadRequest(format!(
            "Model '{}' does not accept new records",
            schema.name
        )));
    }

    let mut record = Record::from_input(schema, body, Operation::Create)?;
    record.hash_secrets(password::hash_password)?;
    Ok(repo.insert(&record).await?)
}

pub async fn read(repo: &DynamicRepository<'_>, id: &str) -> Result<Row, SchemeError> {
    let key = parse_key(repo.schema(), id)?;
    repo.select_by_key(&key).await?.ok_or_else(|| not_found(repo, &key))
}

/// Change only the fields present in `body`
pub async fn patch(repo: &DynamicRepository<'_>, body: &Value) -> Result<Row, SchemeError> {
    write(repo, body, Operation::Patch).await
}

/// Replace every writable field; omitted optional fields become null
pub async fn update(repo: &DynamicRepository<'_>, body: &Value) -> Result<Row, SchemeError> {
    write(repo, body, Operation::Replace).await
}

async fn write(repo: &DynamicRepository<'_>, body: &Value, op: Operation) -> Result<Row, SchemeError> {
    let schema = repo.schema();
    ensure_writable(schema)?;

    let mut record = Record::from_input(schema, body, op)?;
    record.hash_secrets(password::hash_password)?;
    let key = record.key.clone().unwrap_or_default();

    repo.update(&key, &record).await?.ok_or_else(|| not_found(repo, &key))
}

fn not_found(repo: &DynamicRepository<'_>, key: &str) -> SchemeError {
    SchemeError::NotFound(format!("{} '{}' not found", repo.schema().name, key))
}
