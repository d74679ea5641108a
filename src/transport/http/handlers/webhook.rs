use crate::app::{NotifyError, NotifyOutcome};
use crate::domain::{TransactionEvent, TransactionStatus, TxValue, WalletAddress};
use crate::transport::http::handlers::common::{respond, store_unavailable};
use crate::transport::http::handlers::notify::outcome_json;
use crate::transport::http::types::{json_422, ApiResponse, AppState, WebhookActivity, WebhookRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

/// Mined activity reported by the webhook provider, as a notifier event.
pub fn activity_to_event(activity: &WebhookActivity) -> TransactionEvent {
    let value = activity
        .raw_contract
        .as_ref()
        .and_then(|c| c.raw_value.clone())
        .map(|raw| TxValue(JsonValue::String(raw)))
        .unwrap_or_else(|| activity.value.clone());
    let block_number = activity.block_num.as_deref().and_then(|b| {
        let b = b.trim();
        match b.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => b.parse().ok(),
        }
    });

    TransactionEvent {
        hash: activity.hash.clone().unwrap_or_default(),
        from: activity.from_address.clone().unwrap_or_default(),
        to: activity.to_address.clone(),
        value,
        status: TransactionStatus::Confirmed,
        block_number,
        timestamp: Utc::now(),
    }
}

/// Distinct, well-formed wallet addresses touched by an activity (sender first).
fn participants(activity: &WebhookActivity) -> Vec<WalletAddress> {
    let mut wallets: Vec<WalletAddress> = Vec::new();
    for raw in [&activity.from_address, &activity.to_address].into_iter().flatten() {
        match WalletAddress::parse(raw) {
            Ok(w) if !wallets.contains(&w) => wallets.push(w),
            Ok(_) => {}
            Err(_) => debug!(address = %raw, "Skipping malformed address in webhook activity"),
        }
    }
    wallets
}

#[utoipa::path(
    post,
    path = "/api/webhook",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Activity processed", body = ApiResponse),
        (status = 400, description = "Invalid webhook payload", body = ApiResponse),
        (status = 404, description = "No registered email for any wallet in the activity", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Email delivery failed", body = ApiResponse),
        (status = 503, description = "Store unavailable", body = ApiResponse)
    )
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    request: Result<Json<WebhookRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"event\": {\"activity\": ...}}").into_response(),
    };

    let activities = match request.event.and_then(|e| e.activity) {
        Some(a) => a.into_vec(),
        None => {
            return respond(
                StatusCode::BAD_REQUEST,
                ApiResponse::err("Invalid webhook payload", None),
            )
        }
    };
    if activities.is_empty()
        || activities
            .iter()
            .any(|a| a.from_address.is_none() && a.to_address.is_none())
    {
        return respond(
            StatusCode::BAD_REQUEST,
            ApiResponse::err("No wallet address in activity", None),
        );
    }

    let mut results: Vec<JsonValue> = Vec::new();
    let mut any_registered = false;
    let mut delivery_failed = false;

    for activity in &activities {
        if activity.hash.as_deref().map_or(true, |h| h.trim().is_empty()) {
            warn!("Skipping webhook activity without a transaction hash");
            continue;
        }
        let event = activity_to_event(activity);

        for wallet in participants(activity) {
            let result = state.notifier.notify(&wallet, &event).await;
            match &result {
                Ok(NotifyOutcome::Notified { .. }) | Ok(NotifyOutcome::AlreadyNotified { .. }) => {
                    any_registered = true
                }
                Err(NotifyError::NotRegistered(_)) => {}
                Err(NotifyError::DeliveryFailed { .. }) => {
                    any_registered = true;
                    delivery_failed = true;
                }
                Err(NotifyError::StoreUnavailable(detail)) => return store_unavailable(detail),
            }
            let mut entry = outcome_json(&result);
            if let JsonValue::Object(map) = &mut entry {
                map.insert("hash".to_string(), json!(event.hash));
                map.insert("walletAddress".to_string(), json!(wallet));
            }
            results.push(entry);
        }
    }

    let data = Some(json!({ "results": results }));
    if delivery_failed {
        respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::err("Email delivery failed", data),
        )
    } else if !any_registered {
        respond(
            StatusCode::NOT_FOUND,
            ApiResponse::err("No registered email for this wallet", data),
        )
    } else {
        respond(
            StatusCode::OK,
            ApiResponse::ok("Notification sent successfully", data),
        )
    }
}
