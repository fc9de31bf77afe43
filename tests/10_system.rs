mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );
    let body: Value = res.json().await?;
    assert!(body["status"] == "healthy" || body["status"] == "unhealthy");
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_returns_welcome_document() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["name"], "SIMS API");
    assert!(body["version"].is_string());
    assert!(body["endpoints"].is_object());
    Ok(())
}

#[tokio::test]
async fn scheme_status_is_public() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/scheme")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Scheme routes active ");
    Ok(())
}

#[tokio::test]
async fn unknown_image_id_is_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/upload/image/not-a-uuid/photo.png")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
