// handlers/public/auth/signup.rs - POST /api/signup

use axum::{extract::Request, Extension};
use serde_json::{json, Value};

use crate::api::validate::present;
use crate::api::{format, FieldErrors, MultipartForm};
use crate::app::AppState;
use crate::auth;
use crate::config::CONFIG;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service::{AccountService, SignupInput};
use crate::storage::{ImageKind, NewImage};

/// Validate the signup form; the email comes back normalized
pub fn signup_input(form: &MultipartForm) -> Result<SignupInput, crate::error::ApiError> {
    let mut errors = FieldErrors::new();
    let organization_name = errors.required("organizationName", form.field("organizationName"));
    let organization_location = errors.required("organizationLocation", form.field("organizationLocation"));
    let user_name = errors.required("userName", form.field("userName"));
    let organization_bio = errors.required("organizationBio", form.field("organizationBio"));
    let email = errors.email("email", form.field("email"));
    let password = errors.password("password", form.field("password"));
    errors.finish()?;

    Ok(SignupInput {
        organization_name: organization_name.to_string(),
        organization_location: organization_location.to_string(),
        organization_bio: organization_bio.to_string(),
        organization_photo: present(form.field("organizationPhoto")).map(str::to_string),
        user_name: user_name.to_string(),
        email,
        password: password.to_string(),
    })
}

/// POST /api/signup - create an organization with its Admin role and first user.
///
/// Accepts JSON or multipart; a multipart `organizationPhoto` file is stored
/// as the organization's photo.
pub async fn signup_post(Extension(state): Extension<AppState>, request: Request) -> ApiResult<Value> {
    let mut form = MultipartForm::read_any(request).await?;
    let input = signup_input(&form)?;

    let photo = form.take_file("organizationPhoto");
    if let Some(file) = &photo {
        if !file.content_type.starts_with("image/") {
            return Err(crate::error::ApiError::bad_request("Only image uploads are allowed"));
        }
    }

    let service = AccountService::new().await?;
    let mut account = service.signup(input).await?;

    if let Some(file) = photo {
        let org_id = account.organization.org_id;
        let image = NewImage::from_upload(file, ImageKind::OrganizationPhoto, org_id, account.user.user_id)
            .owned_by(org_id.to_string());
        image.validate_image(CONFIG.uploads.max_image_bytes)?;
        let meta = state.images.put(image).await?;
        sqlx::query("UPDATE organizations SET org_picture = $1 WHERE org_id = $2")
            .bind(meta.url())
            .bind(org_id)
            .execute(service.pool())
            .await?;
        account.organization.org_picture = Some(meta.url());
    }

    let tokens = auth::generate_token_pair(account.user.user_id)?;
    tracing::info!("Signup: {} registered organization {}", account.user.email, account.organization.org_id);

    Ok(ApiResponse::created(json!({
        "accessToken": tokens.access_token,
        "refreshToken": tokens.refresh_token,
        "user": format::user_json(&account),
        "organization": format::organization_json(&account.organization),
    }))
    .with_message("Organization registered successfully"))
}
