mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

// These tests need a Postgres database at DATABASE_URL and skip without one.

async fn count_organizations(name: &str) -> Result<i64> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = sqlx::PgPool::connect(&url).await?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations WHERE org_name = $1")
        .bind(name)
        .fetch_one(&pool)
        .await?;
    pool.close().await;
    Ok(count)
}

fn ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .as_array()
        .map(|list| list.iter().filter_map(|p| p["permission_id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

#[tokio::test]
async fn signup_creates_admin_and_signs_in() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Accounts Signup").await?;

    let res = reqwest::Client::new()
        .post(server.url("/api/signin"))
        .json(&json!({ "email": session.email.to_uppercase(), "password": common::PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let role = &body["data"]["user"]["role"];
    assert_eq!(role["name"], "Admin");
    for permission in ["canManageUsers", "canManageRoles", "canManageItems", "canViewReports"] {
        assert_eq!(role["permissions"][permission], true, "{}", permission);
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_leaves_no_organization_behind() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Accounts First").await?;

    let organization = format!("Accounts Duplicate {}", Uuid::new_v4().simple());
    let res = reqwest::Client::new()
        .post(server.url("/api/signup"))
        .json(&json!({
            "organizationName": organization,
            "organizationLocation": "Abuja",
            "userName": "Copycat",
            "organizationBio": "Same email",
            "email": session.email.to_uppercase(),
            "password": common::PASSWORD,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(count_organizations(&organization).await?, 0);
    Ok(())
}

#[tokio::test]
async fn role_permissions_are_replaced_atomically() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let session = common::signup(server, "Accounts Roles").await?;

    let (status, body) = common::call(server, &session, Method::GET, "/permissions", None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let catalogue = ids(&body["data"]);
    assert!(catalogue.len() >= 3, "{}", body);

    let (status, body) = common::call(
        server,
        &session,
        Method::POST,
        "/roles",
        Some(json!({ "role_name": "Storekeeper", "permissions": [catalogue[0]] })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let role_id = body["data"]["role"]["role_id"].as_str().unwrap_or_default().to_string();
    let path = format!("/roles/{}/permissions", role_id);

    let replacement = vec![catalogue[1].clone(), catalogue[2].clone()];
    let (status, body) = common::call(server, &session, Method::PUT, &path, Some(json!({ "permissions": replacement }))).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(ids(&body["data"]["permissions"]), replacement);

    // one unknown id rejects the whole set and keeps the previous one
    let bad = json!({ "permissions": [catalogue[0], Uuid::new_v4().to_string()] });
    let (status, body) = common::call(server, &session, Method::PUT, &path, Some(bad)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = common::call(server, &session, Method::GET, &path, None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(ids(&body["data"]["permissions"]), replacement);
    Ok(())
}

#[tokio::test]
async fn roles_of_another_organization_are_hidden() -> Result<()> {
    let Some(server) = common::ensure_db_server().await? else { return Ok(()) };
    let owner = common::signup(server, "Accounts Owner").await?;
    let other = common::signup(server, "Accounts Other").await?;

    let (_, body) = common::call(server, &owner, Method::POST, "/roles", Some(json!({ "role_name": "Private" }))).await?;
    let role_id = body["data"]["role"]["role_id"].as_str().unwrap_or_default().to_string();

    let path = format!("/roles/{}/permissions", role_id);
    let (status, _) = common::call(server, &other, Method::GET, &path, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
