// handlers/public/system.rs - Service root and health check

use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;

/// GET / - welcome document
pub async fn root_get() -> Json<Value> {
    Json(json!({
        "name": "SIMS API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Inventory and asset tracking backend",
        "endpoints": {
            "auth": "/api/{signup,signin,refresh-token,verify,logout}",
            "items": "/items",
            "scanner": "/scanner",
            "scheme": "/scheme",
            "health": "/health",
        }
    }))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health_get() -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": timestamp,
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unavailable",
                    "timestamp": timestamp,
                })),
            )
        }
    }
}
