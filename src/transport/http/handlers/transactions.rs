use crate::transport::http::handlers::common::require_wallet;
use crate::transport::http::types::{AppState, TransactionsQuery};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::error;

/// Pass-through to the explorer's address transaction listing.
///
/// The body is the explorer's own document (not the usual envelope) and always carries `items`.
#[utoipa::path(
    get,
    path = "/api/blockscout/transactions",
    params(TransactionsQuery),
    responses(
        (status = 200, description = "Explorer response with an `items` array"),
        (status = 400, description = "Missing or malformed address", body = ApiResponse),
        (status = 500, description = "Explorer request failed; `items` is empty")
    )
)]
pub async fn transactions_handler(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> impl IntoResponse {
    let wallet = match require_wallet(query.address.as_deref(), "address") {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let start_timestamp = query
        .start_timestamp
        .as_deref()
        .filter(|s| !s.trim().is_empty());

    match state
        .explorer
        .address_transactions(&wallet, start_timestamp)
        .await
    {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            error!(error = %e, wallet = %wallet, "Explorer request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "items": [] })),
            )
                .into_response()
        }
    }
}
