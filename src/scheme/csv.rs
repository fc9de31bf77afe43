use serde::Serialize;
use serde_json::{Map, Value};

use super::schema::{FieldDef, ModelSchema};
use super::{ensure_writable, SchemeError};
use crate::auth::password;
use crate::database::record::{Operation, Record};
use crate::database::{DatabaseError, DynamicRepository};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowError {
    /// Line number in the uploaded file; the header is line 1
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CsvImport {
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

/// Text shown for a value in CSV and PDF reports
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_csv(header: &[&str], rows: &[Vec<String>]) -> Result<String, SchemeError> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SchemeError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|e| SchemeError::BadRequest(e.to_string()))
}

/// Header row listing every field a client can supply
pub fn template(schema: &ModelSchema) -> Result<String, SchemeError> {
    let header: Vec<&str> = schema.input_fields().map(|f| f.label).collect();
    write_csv(&header, &[])
}

/// Report columns for the given rows
pub fn render_report(schema: &ModelSchema, rows: &[Map<String, Value>]) -> Result<String, SchemeError> {
    let fields: Vec<&FieldDef> = schema.report_fields().collect();
    let header: Vec<&str> = fields.iter().map(|f| f.label).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| fields.iter().map(|f| display_value(row.get(f.name))).collect())
        .collect();
    write_csv(&header, &body)
}

pub async fn generate(repo: &DynamicRepository<'_>) -> Result<String, SchemeError> {
    let rows = repo.select_filter(&repo.filter()).await?;
    render_report(repo.schema(), &rows)
}

/// Resolve every header cell to a field; unknown headers reject the whole file
pub fn resolve_header<'s>(schema: &'s ModelSchema, header: &csv::StringRecord) -> Result<Vec<&'s FieldDef>, SchemeError> {
    let mut fields = Vec::with_capacity(header.len());
    for cell in header.iter() {
        let field = schema
            .field_by_label_or_name(cell)
            .ok_or_else(|| SchemeError::BadRequest(format!("Unknown column '{}' for {}", cell.trim(), schema.name)))?;
        if fields.iter().any(|f: &&FieldDef| f.name == field.name) {
            return Err(SchemeError::BadRequest(format!("Column '{}' appears twice", cell.trim())));
        }
        fields.push(field);
    }
    Ok(fields)
}

/// Parse `data` into one validated Record per line, keeping failures per line
pub fn parse_rows(schema: &ModelSchema, data: &[u8]) -> Result<Vec<(usize, Result<Record, SchemeError>)>, SchemeError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
    let fields = resolve_header(schema, reader.headers()?)?;

    let mut out = Vec::new();
    let mut records = reader.into_records();
    while let Some(result) = records.next() {
        let position = match &result {
            Ok(record) => record.position(),
            Err(err) => err.position(),
        };
        // quoted cells may span lines, so count from where the record starts
        let line = position.map_or_else(|| records.reader().position().line(), |p| p.line()) as usize;
        let parsed = result.map_err(SchemeError::from).and_then(|record| {
            let input: Map<String, Value> = fields
                .iter()
                .zip(record.iter())
                .map(|(field, cell)| (field.name.to_string(), Value::String(cell.to_string())))
                .collect();
            Ok(Record::from_map(schema, &input, Operation::Create)?)
        });
        out.push((line, parsed));
    }
    Ok(out)
}

/// Insert every valid line on its own; one bad line does not stop the others
pub async fn upload(repo: &DynamicRepository<'_>, data: &[u8]) -> Result<CsvImport, SchemeError> {
    let schema = repo.schema();
    ensure_writable(schema)?;
    if !schema.creatable {
        return Err(SchemeError::BadRequest(format!("Model '{}' does not accept new records", schema.name)));
    }

    let mut summary = CsvImport::default();
    for (row, parsed) in parse_rows(schema, data)? {
        let outcome = match parsed {
            Ok(mut record) => match record.hash_secrets(password::hash_password) {
                Ok(()) => repo.insert(&record).await.map(|_| ()).map_err(SchemeError::from),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => summary.inserted += 1,
            Err(err) => {
                summary.failed += 1;
                summary.errors.push(RowError { row, message: row_message(err) });
            }
        }
    }

    tracing::info!(
        "CSV import into {}: {} inserted, {} failed",
        schema.name,
        summary.inserted,
        summary.failed
    );
    Ok(summary)
}

fn row_message(err: SchemeError) -> String {
    match err {
        SchemeError::Record(crate::database::record::RecordError::Invalid(errors)) => {
            let mut parts: Vec<String> = errors.into_iter().map(|(f, m)| format!("{}: {}", f, m)).collect();
            parts.sort();
            parts.join("; ")
        }
        SchemeError::Database(DatabaseError::InvalidReference { field, message }) => format!("{}: {}", field, message),
        other => ApiError::from(other).message().to_string(),
    }
}
