#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "sims-test-access-secret";
pub const REFRESH_SECRET: &str = "sims-test-refresh-secret";

static SERVER: OnceLock<TestServer> = OnceLock::new();
static DB_SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(database_url: Option<&str>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Cargo builds the server binary for integration tests
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sims-api"));
        cmd.env("SIMS_API_PORT", port.to_string())
            .env("JWT_SECRET", ACCESS_SECRET)
            .env("JWT_REFRESH_SECRET", REFRESH_SECRET)
            .env("RUST_LOG", "sims_api=warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        match database_url {
            Some(url) => cmd.env("DATABASE_URL", url),
            // No database: every check here must be answered before one is needed
            None => cmd.env_remove("DATABASE_URL"),
        };

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration, expect_database: bool) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                // 503 just means no database is configured
                let unavailable_ok = !expect_database && resp.status() == StatusCode::SERVICE_UNAVAILABLE;
                if resp.status() == StatusCode::OK || unavailable_ok {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn(None).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15), false).await?;
    Ok(server)
}

/// Server backed by `DATABASE_URL` with migrations applied; `None` when the
/// variable is unset so database tests skip instead of failing.
pub async fn ensure_db_server() -> Result<Option<&'static TestServer>> {
    let _ = dotenvy::dotenv();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return Ok(None);
    };

    let server = DB_SERVER.get_or_init(|| {
        migrate(&database_url).expect("failed to apply migrations");
        TestServer::spawn(Some(&database_url)).expect("failed to spawn server binary")
    });
    server.wait_ready(Duration::from_secs(20), true).await?;
    Ok(Some(server))
}

fn migrate(database_url: &str) -> Result<()> {
    let status = Command::new(env!("CARGO_BIN_EXE_sims"))
        .arg("migrate")
        .env("DATABASE_URL", database_url)
        .env("RUST_LOG", "sims_api=warn")
        .stdin(Stdio::null())
        .status()
        .context("failed to run sims migrate")?;
    anyhow::ensure!(status.success(), "sims migrate exited with {}", status);
    Ok(())
}

pub const PASSWORD: &str = "Str0ng!Pass";

/// A freshly registered organization and its admin
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub org_id: String,
    pub email: String,
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

pub async fn signup(server: &TestServer, organization: &str) -> Result<Session> {
    let email = unique_email("admin");
    let res = reqwest::Client::new()
        .post(server.url("/api/signup"))
        .json(&json!({
            "organizationName": organization,
            "organizationLocation": "Lagos",
            "userName": "Ada Admin",
            "organizationBio": "Tools and equipment",
            "email": email,
            "password": PASSWORD,
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "signup failed with {}", res.status());

    let body: Value = res.json().await?;
    let data = &body["data"];
    Ok(Session {
        token: data["accessToken"].as_str().context("missing accessToken")?.to_string(),
        user_id: data["user"]["id"].as_str().context("missing user id")?.to_string(),
        org_id: data["organization"]["id"].as_str().context("missing organization id")?.to_string(),
        email,
    })
}

/// Send `body` as JSON with the session's bearer token
pub async fn call(
    server: &TestServer,
    session: &Session,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut req = reqwest::Client::new()
        .request(method, server.url(path))
        .bearer_auth(&session.token);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let res = req.send().await?;
    let status = res.status();
    Ok((status, res.json().await?))
}
