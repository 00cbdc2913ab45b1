//! HTTP/JSON surface of the registry.
//!
//! Key management lives under `/api/keys`. Cryptographic operations,
//! benchmarks and demonstrations are served at the root and again under
//! `/api`.

pub mod crypto;
pub mod demo;
pub mod keys;
pub mod response;

use crate::common::config::ServerConfig;
use crate::error::Result;
use crate::service::CryptoService;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use crypto::CryptoRoutes;
pub use demo::DemoRoutes;
pub use keys::KeyRoutes;
pub use response::{ApiError, ApiJson, ApiSuccess};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CryptoService>,
}

impl AppState {
    pub fn new(service: Arc<CryptoService>) -> Self {
        Self { service }
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    durable_storage: bool,
    storage_healthy: bool,
}

async fn handle_health(State(state): State<AppState>) -> ApiSuccess<HealthBody> {
    ApiSuccess::new(HealthBody {
        status: "ok",
        version: crate::VERSION,
        durable_storage: state.service.is_durable(),
        storage_healthy: state.service.storage_healthy(),
    })
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = CryptoRoutes::routes().merge(DemoRoutes::api_routes());
    Router::new()
        .route("/health", get(handle_health))
        .merge(KeyRoutes::routes())
        .merge(CryptoRoutes::routes())
        .merge(DemoRoutes::routes())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `config.host:config.port` and serves until the process is stopped.
pub async fn serve(config: &ServerConfig, service: Arc<CryptoService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(address = %listener.local_addr()?, "seal-registry listening");
    axum::serve(listener, router(AppState::new(service))).await?;
    Ok(())
}
