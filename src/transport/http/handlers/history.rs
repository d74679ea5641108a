use crate::domain::DEFAULT_HISTORY_LIMIT;
use crate::transport::http::handlers::common::{
    ledger_error_response, ok, registration_error_response, require_wallet, respond,
};
use crate::transport::http::types::{ApiResponse, AppState, HistoryQuery};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

const MAX_HISTORY_LIMIT: u32 = 500;

#[utoipa::path(
    get,
    path = "/api/notifications/{wallet}",
    params(
        ("wallet" = String, Path, description = "Registered wallet address"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Notifications sent for this wallet, newest first", body = ApiResponse),
        (status = 400, description = "Malformed wallet address", body = ApiResponse),
        (status = 404, description = "Wallet is not registered", body = ApiResponse),
        (status = 503, description = "Store unavailable", body = ApiResponse)
    )
)]
pub async fn history_handler(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let wallet = match require_wallet(Some(&wallet), "wallet") {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let registration = match state.registrations.lookup_by_wallet(&wallet).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            return respond(
                StatusCode::NOT_FOUND,
                ApiResponse::err("No registered email for this wallet", None),
            )
        }
        Err(e) => return registration_error_response(e),
    };

    match state.ledger.history(&registration.user_id, limit).await {
        Ok(records) => ok(
            "ok",
            serde_json::json!({
                "walletAddress": registration.wallet_address,
                "userId": registration.user_id,
                "count": records.len(),
                "notifications": records,
            }),
        ),
        Err(e) => ledger_error_response(e),
    }
}
