use axum::{response::Response, Extension};

use super::list::org_users;
use crate::api::download::{attachment, CSV};
use crate::database::models::UserListing;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;

const HEADER: [&str; 7] = ["ID", "Full Name", "Email", "Department", "Branch", "Role", "Status"];

pub fn users_csv(users: &[UserListing]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(HEADER)?;
    for user in users {
        let id = user.user_id.to_string();
        writer.write_record([
            id.as_str(),
            user.full_name.as_str(),
            user.email.as_str(),
            user.department.as_deref().unwrap_or_default(),
            user.branch.as_deref().unwrap_or_default(),
            user.role_name.as_deref().unwrap_or_default(),
            user.status.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// GET /user/export - the organization's users as a CSV download
pub async fn get(Extension(user): Extension<ValidatedUser>) -> Result<Response, ApiError> {
    let users = org_users(user.org_id(), None).await?;
    let body = users_csv(&users).map_err(|e| {
        tracing::error!("User export failed: {}", e);
        ApiError::internal_server_error("Failed to export users")
    })?;

    Ok(attachment(CSV, "users.csv", body))
}
