use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn routes() -> Router {
    Router::new().route("/status", get(status))
}

async fn status() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
