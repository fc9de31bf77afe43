// handlers/public/scheme.rs - GET /scheme

use axum::response::Json;
use serde_json::{json, Value};

pub async fn status_get() -> Json<Value> {
    Json(json!({ "message": "Scheme routes active " }))
}
