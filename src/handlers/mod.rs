mod confirm;
mod purchase;
mod validate;

pub use confirm::*;
pub use purchase::*;
pub use validate::*;

use axum::{Json, Router, routing::{get, post}};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/purchase", post(initiate_purchase))
        .route("/purchase/confirm", post(confirm_purchase))
        .route("/purchase/retry-order", post(retry_order))
        .route("/validate", post(validate_license))
}
