//! Cryptographic operation routes. Mounted both at the root and under `/api`.

use super::response::{blocking, ApiError, ApiJson, ApiSuccess};
use super::AppState;
use crate::hashing::HashAlgorithm;
use axum::response::IntoResponse;
use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SignBody {
    pub data: String,
    pub key_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub data: String,
    pub signature: String,
    pub key_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecryptBody {
    pub encrypted_data: String,
}

#[derive(Debug, Deserialize)]
pub struct HashAndSignBody {
    pub data: String,
    pub algorithm: Option<String>,
    pub key_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyHashSignatureBody {
    pub data: String,
    pub signature: String,
    pub expected_hash: String,
    pub algorithm: Option<String>,
    pub key_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComputeHashBody {
    pub data: String,
    pub algorithm: Option<String>,
}

fn parse_algorithm(raw: Option<&str>) -> Result<Option<HashAlgorithm>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .transpose()
        .map_err(ApiError::from)
}

pub struct CryptoRoutes;

impl CryptoRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/sign", post(Self::handle_sign))
            .route("/verify", post(Self::handle_verify))
            .route("/encrypt", post(Self::handle_encrypt))
            .route("/decrypt", post(Self::handle_decrypt))
            .route("/hash-and-sign", post(Self::handle_hash_and_sign))
            .route("/verify-hash-signature", post(Self::handle_verify_hash_signature))
            .route("/compute-hash", post(Self::handle_compute_hash))
    }

    async fn handle_sign(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<SignBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let outcome = blocking(&state.service, move |service| {
            service.sign(&body.data, body.key_id.as_deref())
        })
        .await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_verify(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<VerifyBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let outcome = blocking(&state.service, move |service| {
            service.verify(&body.data, &body.signature, body.key_id.as_deref())
        })
        .await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_encrypt(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<SignBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let outcome = blocking(&state.service, move |service| {
            service.encrypt(&body.data, body.key_id.as_deref())
        })
        .await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_decrypt(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<DecryptBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let outcome =
            blocking(&state.service, move |service| service.decrypt(&body.encrypted_data)).await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_hash_and_sign(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<HashAndSignBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let algorithm = parse_algorithm(body.algorithm.as_deref())?;
        let outcome = blocking(&state.service, move |service| {
            service.hash_and_sign(&body.data, algorithm, body.key_id.as_deref())
        })
        .await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_verify_hash_signature(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<VerifyHashSignatureBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let algorithm = parse_algorithm(body.algorithm.as_deref())?;
        let outcome = blocking(&state.service, move |service| {
            service.verify_hash_signature(
                &body.data,
                &body.signature,
                &body.expected_hash,
                algorithm,
                body.key_id.as_deref(),
            )
        })
        .await?;
        Ok(ApiSuccess::new(outcome))
    }

    async fn handle_compute_hash(
        State(state): State<AppState>,
        ApiJson(body): ApiJson<ComputeHashBody>,
    ) -> Result<impl IntoResponse, ApiError> {
        let algorithm = parse_algorithm(body.algorithm.as_deref())?;
        let outcome = state.service.compute_hash(&body.data, algorithm)?;
        Ok(ApiSuccess::new(outcome))
    }
}
