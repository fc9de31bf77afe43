mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

// These tests need a Postgres database at DATABASE_URL and skip without one.

#[tokio::test]
async fn create_then_read_vendor() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Scheme Vendors").await?;

    let (status, body) = common::call(
        server,
        &session,
        Method::POST,
        "/scheme/vendor",
        Some(json!({ "vendor_name": "Acme Supply", "contact_email": "Sales@Acme.test" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["contact_email"], "sales@acme.test");
    assert_eq!(body["data"]["org_id"], session.org_id);

    let vendor_id = body["data"]["vendor_id"].as_str().unwrap_or_default().to_string();
    let (status, body) = common::call(server, &session, Method::GET, &format!("/scheme/vendor?id={}", vendor_id), None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["vendor_name"], "Acme Supply");
    Ok(())
}

#[tokio::test]
async fn missing_record_is_not_found() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Scheme Missing").await?;

    let path = format!("/scheme/item?id={}", Uuid::new_v4());
    let (status, body) = common::call(server, &session, Method::GET, &path, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn invalid_user_fields_are_rejected() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Scheme Users").await?;

    let (status, body) = common::call(
        server,
        &session,
        Method::POST,
        "/scheme/user",
        Some(json!({ "full_name": "Bob", "email": "not-an-email", "password": "x", "status": "banana" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    let fields = &body["field_errors"];
    assert_eq!(fields["email"], "Invalid email format");
    assert!(fields["password"].as_str().unwrap_or_default().starts_with("Password must be"));
    assert!(fields["status"].as_str().unwrap_or_default().starts_with("Must be one of"));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_differing_in_case_is_rejected() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Scheme Emails").await?;

    let user = |email: String| json!({ "full_name": "Bob", "email": email, "password": common::PASSWORD });
    let (status, body) = common::call(server, &session, Method::POST, "/scheme/user", Some(user(session.email.to_uppercase()))).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    Ok(())
}

#[tokio::test]
async fn foreign_keys_must_belong_to_the_caller() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let owner = common::signup(server, "Scheme Owner").await?;
    let intruder = common::signup(server, "Scheme Intruder").await?;

    let (status, body) = common::call(
        server,
        &owner,
        Method::POST,
        "/scheme/vendor",
        Some(json!({ "vendor_name": "Private Vendor" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let vendor_id = body["data"]["vendor_id"].clone();

    let (status, body) = common::call(
        server,
        &intruder,
        Method::POST,
        "/scheme/item",
        Some(json!({ "item_name": "Drill", "serial_id": "SX-1", "vendor_id": vendor_id, "assigned_to": owner.user_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert!(body["field_errors"].get("vendor_id").is_some() || body["field_errors"].get("assigned_to").is_some());
    Ok(())
}

#[tokio::test]
async fn csv_upload_keeps_good_rows() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Scheme Csv").await?;

    let data = "Vendor Name,Contact Email\nBolt Co,bolts@example.com\n,nobody@example.com\nNut Co,not-an-email\n";
    let part = reqwest::multipart::Part::bytes(data.as_bytes().to_vec())
        .file_name("vendors.csv")
        .mime_str("text/csv")?;
    let res = reqwest::Client::new()
        .put(server.url("/scheme/csv/upload/vendor"))
        .bearer_auth(&session.token)
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await?;
    let status = res.status();
    let body: serde_json::Value = res.json().await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let summary = &body["data"];
    assert_eq!(summary["inserted"], 1);
    assert_eq!(summary["failed"], 2);
    let rows: Vec<u64> = summary["errors"]
        .as_array()
        .map(|errors| errors.iter().filter_map(|e| e["row"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(rows, [3, 4]);

    let (status, body) = common::call(server, &session, Method::GET, "/scheme/list/vendor", None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.to_string().contains("Bolt Co"));
    Ok(())
}
