//! HTTP handlers, grouped by resource.
//!
//! Handlers validate the body, call into the registries and shape the JSON
//! response; all failures surface as [`crate::error::AppError`].

pub mod games;
pub mod lobby;
pub mod social;
pub mod vote;

use axum::Json;
use serde_json::{json, Value};

/// `GET /status`
pub async fn status() -> Json<Value> {
    Json(json!({ "success": "success" }))
}
