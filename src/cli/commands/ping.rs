use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::CONFIG;

pub fn health_url(base: Option<&str>) -> String {
    let base = match base {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => format!("http://localhost:{}", CONFIG.api.port),
    };
    format!("{}/health", base)
}

pub async fn handle(url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let target = health_url(url.as_deref());
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

    let started = Instant::now();
    let response = match client.get(&target).send().await {
        Ok(response) => response,
        Err(e) => {
            output_error(&output_format, &format!("{} unreachable: {}", target, e), Some("UNREACHABLE"))?;
            anyhow::bail!("server unreachable");
        }
    };
    let elapsed_ms = started.elapsed().as_millis();
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(
            &output_format,
            &format!("{} is healthy ({} ms)", target, elapsed_ms),
            Some(json!({ "status": status.as_u16(), "elapsed_ms": elapsed_ms, "health": body })),
        )
    } else {
        output_error(&output_format, &format!("{} answered {}", target, status), Some("UNHEALTHY"))?;
        anyhow::bail!("server unhealthy")
    }
}
