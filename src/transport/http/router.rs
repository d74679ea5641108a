use crate::transport::http::handlers::{health, history, notify, register, transactions, webhook};
use crate::transport::http::types::{
    ApiResponse, AppState, NotifyRequest, RawContract, RegisterRequest, WebhookActivity,
    WebhookEvent, WebhookRequest,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        register::register_handler,
        register::registration_count_handler,
        notify::notify_handler,
        webhook::webhook_handler,
        transactions::transactions_handler,
        history::history_handler
    ),
    components(schemas(
        ApiResponse,
        RegisterRequest,
        NotifyRequest,
        WebhookRequest,
        WebhookEvent,
        WebhookActivity,
        RawContract
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/api/register",
            post(register::register_handler).get(register::registration_count_handler),
        )
        .route("/api/notify", post(notify::notify_handler))
        .route("/api/webhook", post(webhook::webhook_handler))
        .route(
            "/api/blockscout/transactions",
            get(transactions::transactions_handler),
        )
        .route("/api/notifications/:wallet", get(history::history_handler))
        .with_state(app_state)
}
