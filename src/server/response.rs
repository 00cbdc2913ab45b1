//! Response envelope, error mapping and extractors for the HTTP layer.
//!
//! Every response carries `success`. Failures are `{ "success": false, "error": "..." }`
//! with a status code derived from [`ErrorKind`].

use crate::error::{Error, ErrorKind};
use crate::service::CryptoService;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Successful response: `success: true` plus the flattened body.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Error crossing the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::KeyInactive | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::DecryptionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = json!({
            "success": false,
            "error": self.0.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the `{success:false}` envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query extractor whose rejections use the `{success:false}` envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Runs a service call on the blocking pool.
pub async fn blocking<T, F>(service: &Arc<CryptoService>, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&CryptoService) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| ApiError(Error::Internal(format!("worker task failed: {e}"))))?
        .map_err(ApiError::from)
}
