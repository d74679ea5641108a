// src/bin/api_server.rs

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tranzantions::infra::{config, logging, mailer, ExplorerClient};
use tranzantions::transport;
use tranzantions::{EmailComposer, Notifier, Stores};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    // --- Stores ---
    let stores = Stores::from_env().await?;
    if let Err(e) = stores.registrations.ping().await {
        error!(error = %e, "Registration store is not reachable at startup");
        return Err(e.into());
    }

    // --- Notifier ---
    let mailer = mailer::from_env()?;
    let notifier = Notifier::new(
        stores.registrations.clone(),
        stores.ledger.clone(),
        mailer,
        EmailComposer::from_env(),
    )
    .with_dev_fallback(config::dev_fallback_email()?);

    let explorer = ExplorerClient::from_env()?;
    info!(explorer = %explorer.base_url(), "Explorer client ready");

    let app_state = transport::http::AppState {
        registrations: stores.registrations.clone(),
        ledger: stores.ledger.clone(),
        notifier: Arc::new(notifier),
        explorer: Arc::new(explorer),
        backend: stores.backend,
    };

    // --- API Server ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);

    let addr = config::listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
