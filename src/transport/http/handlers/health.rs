use crate::infra::config::StoreBackend;
use crate::transport::http::handlers::common::respond;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy (stores reachable)", body = ApiResponse),
        (status = 503, description = "Service is unhealthy (store unreachable)", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = match state.backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };

    let result = match state.registrations.ping().await {
        Ok(()) => state.ledger.ping().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(()) => respond(
            StatusCode::OK,
            ApiResponse::ok("ok", Some(serde_json::json!({ "status": "ok", "store": backend }))),
        ),
        Err(e) => respond(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiResponse::err(
                format!("Store ping failed: {}", e),
                Some(serde_json::json!({ "status": "unhealthy", "store": backend })),
            ),
        ),
    }
}
