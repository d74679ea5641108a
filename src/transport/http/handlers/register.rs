use crate::domain::{EmailAddress, ValidationError};
use crate::transport::http::handlers::common::{
    bad_request, ok, registration_error_response, require_wallet,
};
use crate::transport::http::types::{json_422, AppState, RegisterRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration successful", body = ApiResponse),
        (status = 400, description = "Missing or malformed email / wallet address", body = ApiResponse),
        (status = 409, description = "Wallet address or email already registered", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 503, description = "Registration store unavailable", body = ApiResponse)
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"email\": \"...\", \"walletAddress\": \"0x...\"}").into_response()
        }
    };

    // Validation happens before any store access.
    let email = match request.email.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match EmailAddress::parse(raw) {
            Ok(e) => e,
            Err(e) => return bad_request(e),
        },
        None => return bad_request(ValidationError::MissingField("email")),
    };
    let wallet = match require_wallet(request.wallet_address.as_deref(), "walletAddress") {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    let registration = match state.registrations.register(email, wallet).await {
        Ok(r) => r,
        Err(e) => return registration_error_response(e),
    };
    info!(
        email = %registration.email,
        wallet = %registration.wallet_address,
        user_id = %registration.user_id,
        "Registered wallet"
    );

    let welcome_sent = state.notifier.send_welcome(&registration).await;

    ok(
        "Registration successful",
        serde_json::json!({
            "userId": registration.user_id,
            "email": registration.email,
            "walletAddress": registration.wallet_address,
            "createdAt": registration.created_at,
            "welcomeEmailSent": welcome_sent,
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/register",
    responses(
        (status = 200, description = "Number of registered wallets", body = ApiResponse),
        (status = 503, description = "Registration store unavailable", body = ApiResponse)
    )
)]
pub async fn registration_count_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registrations.count().await {
        Ok(n) => ok("ok", serde_json::json!({ "registeredUsers": n })),
        Err(e) => registration_error_response(e),
    }
}
