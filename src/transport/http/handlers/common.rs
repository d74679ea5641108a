use crate::domain::{LedgerError, RegistrationError, ValidationError, WalletAddress};
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as JsonValue;

pub fn respond(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

pub fn ok(message: impl Into<String>, data: JsonValue) -> Response {
    respond(StatusCode::OK, ApiResponse::ok(message, Some(data)))
}

pub fn bad_request(err: ValidationError) -> Response {
    respond(StatusCode::BAD_REQUEST, ApiResponse::err(err.to_string(), None))
}

pub fn store_unavailable(detail: impl std::fmt::Display) -> Response {
    tracing::error!(error = %detail, "Store unavailable");
    respond(
        StatusCode::SERVICE_UNAVAILABLE,
        ApiResponse::err(format!("Store unavailable: {}", detail), None),
    )
}

/// Parses a required wallet address field.
pub fn require_wallet(raw: Option<&str>, field: &'static str) -> Result<WalletAddress, Response> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| bad_request(ValidationError::MissingField(field)))?;
    WalletAddress::parse(raw).map_err(bad_request)
}

pub fn registration_error_response(err: RegistrationError) -> Response {
    match err {
        RegistrationError::DuplicateWallet | RegistrationError::DuplicateEmail => {
            respond(StatusCode::CONFLICT, ApiResponse::err(err.to_string(), None))
        }
        RegistrationError::StoreUnavailable(detail) => store_unavailable(detail),
    }
}

pub fn ledger_error_response(err: LedgerError) -> Response {
    match err {
        LedgerError::DuplicateNotification => {
            respond(StatusCode::CONFLICT, ApiResponse::err(err.to_string(), None))
        }
        LedgerError::StoreUnavailable(detail) => store_unavailable(detail),
    }
}
