use crate::app::{NotifyError, NotifyOutcome};
use crate::domain::{TransactionEvent, ValidationError};
use crate::transport::http::handlers::common::{
    bad_request, ok, require_wallet, respond, store_unavailable,
};
use crate::transport::http::types::{json_422, ApiResponse, AppState, NotifyRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value as JsonValue};

/// Parses and sanity-checks the `transaction` object of a notify request.
pub fn parse_event(raw: JsonValue) -> Result<TransactionEvent, ValidationError> {
    let event: TransactionEvent = serde_json::from_value(raw)
        .map_err(|e| ValidationError::InvalidTransaction(e.to_string()))?;
    if event.hash.trim().is_empty() {
        return Err(ValidationError::MissingField("transaction.hash"));
    }
    Ok(event)
}

/// JSON summary of a notifier result, shared with the webhook handler.
pub fn outcome_json(result: &Result<NotifyOutcome, NotifyError>) -> JsonValue {
    match result {
        Ok(NotifyOutcome::Notified {
            email,
            transaction_type,
            record,
        }) => json!({
            "outcome": "notified",
            "email": email,
            "transactionType": transaction_type,
            "recorded": record.is_some(),
            "record": record,
        }),
        Ok(NotifyOutcome::AlreadyNotified { transaction_type }) => json!({
            "outcome": "already_notified",
            "transactionType": transaction_type,
        }),
        Err(NotifyError::NotRegistered(wallet)) => json!({
            "outcome": "not_registered",
            "walletAddress": wallet,
        }),
        Err(NotifyError::DeliveryFailed { source, record }) => json!({
            "outcome": "delivery_failed",
            "error": source.to_string(),
            "record": record,
        }),
        Err(NotifyError::StoreUnavailable(detail)) => json!({
            "outcome": "store_unavailable",
            "error": detail,
        }),
    }
}

fn notify_response(result: Result<NotifyOutcome, NotifyError>) -> Response {
    let data = outcome_json(&result);
    match result {
        Ok(NotifyOutcome::Notified { .. }) => ok("Alert sent successfully", data),
        Ok(NotifyOutcome::AlreadyNotified { .. }) => {
            ok("Alert already sent for this transaction status", data)
        }
        Err(NotifyError::NotRegistered(_)) => respond(
            StatusCode::NOT_FOUND,
            ApiResponse::err("No registered email for this wallet", Some(data)),
        ),
        Err(err @ NotifyError::DeliveryFailed { .. }) => respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::err(err.to_string(), Some(data)),
        ),
        Err(NotifyError::StoreUnavailable(detail)) => store_unavailable(detail),
    }
}

#[utoipa::path(
    post,
    path = "/api/notify",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Alert sent, or already sent for this transaction status", body = ApiResponse),
        (status = 400, description = "Missing or malformed wallet address / transaction", body = ApiResponse),
        (status = 404, description = "No registered email for this wallet", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Email delivery failed", body = ApiResponse),
        (status = 503, description = "Store unavailable", body = ApiResponse)
    )
)]
pub async fn notify_handler(
    State(state): State<AppState>,
    request: Result<Json<NotifyRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"walletAddress\": \"0x...\", \"transaction\": {...}}")
                .into_response()
        }
    };

    let wallet = match require_wallet(request.wallet_address.as_deref(), "walletAddress") {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let event = match request.transaction {
        Some(raw) => match parse_event(raw) {
            Ok(ev) => ev,
            Err(e) => return bad_request(e),
        },
        None => return bad_request(ValidationError::MissingField("transaction")),
    };

    notify_response(state.notifier.notify(&wallet, &event).await)
}
