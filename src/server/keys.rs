//! Key management routes under `/api/keys`.

use super::response::{blocking, ApiError, ApiJson, ApiQuery, ApiSuccess};
use super::AppState;
use crate::service::GenerateKeyRequest;
use crate::store::{KeyMetadata, KeyType, Operation};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateKeyBody {
    pub key_size: Option<usize>,
    pub key_type: Option<String>,
    pub key_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OperationsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StatisticsBody<T> {
    statistics: T,
}

#[derive(Debug, Serialize)]
struct KeyBody {
    key: KeyMetadata,
}

#[derive(Debug, Serialize)]
struct OperationsBody {
    key_id: String,
    operations: Vec<Operation>,
}

pub struct KeyRoutes;

impl KeyRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/api/keys/generate", post(Self::handle_generate))
            .route("/api/keys/list", get(Self::handle_list))
            .route("/api/keys/statistics", get(Self::handle_statistics))
            .route("/api/keys/:key_id", get(Self::handle_get))
            .route("/api/keys/:key_id/toggle-status", post(Self::handle_toggle_status))
            .route("/api/keys/:key_id/default", post(Self::handle_set_default))
            .route("/api/keys/:key_id/operations", get(Self::handle_operations))
    }

    /// Handle POST /api/keys/generate
    async fn handle_generate(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<GenerateKeyBody>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let key_type = match body.key_type.as_deref() {
            Some(raw) => raw.parse::<KeyType>()?,
            None => KeyType::Rsa,
        };
        let request = GenerateKeyRequest {
            key_type,
            key_size: body.key_size,
            label: body.key_label,
        };
        let generated = blocking(&state.service, move |service| service.generate_key(request)).await?;
        Ok(ApiSuccess::new(generated))
    }

    /// Handle GET /api/keys/list
    async fn handle_list(
        State(state): State<AppState>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let listing = blocking(&state.service, |service| service.list_keys()).await?;
        Ok(ApiSuccess::new(listing))
    }

    /// Handle GET /api/keys/statistics
    async fn handle_statistics(
        State(state): State<AppState>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let statistics = blocking(&state.service, |service| service.statistics()).await?;
        Ok(ApiSuccess::new(StatisticsBody { statistics }))
    }

    /// Handle GET /api/keys/:key_id
    async fn handle_get(
        State(state): State<AppState>,
        Path(key_id): Path<String>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let key = state.service.get_key(&key_id)?;
        Ok(ApiSuccess::new(KeyBody { key }))
    }

    /// Handle POST /api/keys/:key_id/toggle-status
    async fn handle_toggle_status(
        State(state): State<AppState>,
        Path(key_id): Path<String>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let change = blocking(&state.service, move |service| service.toggle_status(&key_id)).await?;
        Ok(ApiSuccess::new(change))
    }

    /// Handle POST /api/keys/:key_id/default
    async fn handle_set_default(
        State(state): State<AppState>,
        Path(key_id): Path<String>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let key = state.service.set_default_key(&key_id)?;
        Ok(ApiSuccess::new(KeyBody { key }))
    }

    /// Handle GET /api/keys/:key_id/operations
    async fn handle_operations(
        State(state): State<AppState>,
        Path(key_id): Path<String>,
        ApiQuery(query): ApiQuery<OperationsQuery>,
    ) -> Result<impl axum::response::IntoResponse, ApiError> {
        let operations = blocking(&state.service, {
            let key_id = key_id.clone();
            move |service| service.key_operations(&key_id, query.limit)
        })
        .await?;
        Ok(ApiSuccess::new(OperationsBody { key_id, operations }))
    }
}
