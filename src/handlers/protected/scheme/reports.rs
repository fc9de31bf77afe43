use axum::{
    extract::{Multipart, Path},
    response::Response,
    Extension,
};

use super::{repository, writable_repository};
use crate::api::download::{attachment, CSV, PDF};
use crate::api::MultipartForm;
use crate::database::models::role::VIEW_REPORTS;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::scheme::{self, csv, pdf};

/// GET /scheme/csv/template/:model
pub async fn csv_template(Path(model): Path<String>) -> Result<Response, ApiError> {
    let schema = scheme::lookup(&model)?;
    let body = csv::template(schema)?;
    Ok(attachment(CSV, &format!("{}-template.csv", schema.name), body))
}

/// GET /scheme/csv/generate/:model
pub async fn csv_generate(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
) -> Result<Response, ApiError> {
    user.require(VIEW_REPORTS)?;
    let repo = repository(&model, &user).await?;
    let body = csv::generate(&repo).await?;
    Ok(attachment(CSV, &format!("{}-report.csv", repo.schema().name), body))
}

/// PUT /scheme/csv/upload/:model - multipart `file`; every row is inserted on its own
pub async fn csv_upload(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
    multipart: Multipart,
) -> ApiResult<csv::CsvImport> {
    let repo = writable_repository(&model, &user).await?;
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| ApiError::bad_request("No CSV file uploaded"))?;
    if !form.files.is_empty() {
        return Err(ApiError::bad_request("Upload a single CSV file"));
    }

    let summary = csv::upload(&repo, &file.data).await?;
    let message = format!("{} row(s) imported, {} failed", summary.inserted, summary.failed);
    Ok(ApiResponse::success(summary).with_message(message))
}

/// GET /scheme/pdf/generate/:model
pub async fn pdf_generate(
    Extension(user): Extension<ValidatedUser>,
    Path(model): Path<String>,
) -> Result<Response, ApiError> {
    user.require(VIEW_REPORTS)?;
    let repo = repository(&model, &user).await?;
    let body = pdf::generate(&repo).await?;
    Ok(attachment(PDF, &format!("{}-report.pdf", repo.schema().name), body))
}
