mod common;

use anyhow::Result;
use chrono::Duration;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use sims_api::auth::{encode_token, Claims, TokenKind};

async fn post_json(path: &str, body: Value) -> Result<(StatusCode, Value)> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new().post(server.url(path)).json(&body).send().await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

#[tokio::test]
async fn signup_reports_every_missing_field() -> Result<()> {
    let (status, body) = post_json("/api/signup", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let fields = &body["field_errors"];
    for field in ["organizationName", "organizationLocation", "userName", "organizationBio", "email", "password"] {
        assert!(fields.get(field).is_some(), "missing error for {}", field);
    }
    Ok(())
}

#[tokio::test]
async fn signup_rejects_weak_password_and_bad_email() -> Result<()> {
    let (status, body) = post_json(
        "/api/signup",
        json!({
            "organizationName": "Acme",
            "organizationLocation": "Lagos",
            "userName": "Ada",
            "organizationBio": "Tools",
            "email": "not-an-email",
            "password": "short"
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["email"], "Invalid email format");
    assert!(body["field_errors"]["password"].as_str().unwrap_or_default().starts_with("Password must be"));
    Ok(())
}

#[tokio::test]
async fn signup_rejects_malformed_json() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/api/signup"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn signin_requires_credentials() -> Result<()> {
    let (status, body) = post_json("/api/signin", json!({"email": "ada@example.com"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn refresh_requires_a_refresh_token() -> Result<()> {
    let (status, _) = post_json("/api/refresh-token", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json("/api/refresh-token", json!({"refreshToken": "garbage"})).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_expired_tokens() -> Result<()> {
    let access = encode_token(
        &Claims::new(Uuid::new_v4(), TokenKind::Access, Duration::hours(1)),
        common::REFRESH_SECRET,
    )?;
    let (status, body) = post_json("/api/refresh-token", json!({ "refreshToken": access })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");

    let expired = encode_token(
        &Claims::new(Uuid::new_v4(), TokenKind::Refresh, Duration::days(-1)),
        common::REFRESH_SECRET,
    )?;
    let (status, body) = post_json("/api/refresh-token", json!({ "refreshToken": expired })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_EXPIRED");
    Ok(())
}

#[tokio::test]
async fn invitation_verify_requires_token() -> Result<()> {
    let (status, body) = post_json("/invitations/verify", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This field is required");
    Ok(())
}
