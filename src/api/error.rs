//! Maps `EngineError` onto HTTP status plus the envelope's
//! machine-readable code, using the response shape
//! `{ data | error: { code, message }, requestId }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::EngineError;

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    Unauthorized(String),
    BadRequest(String),
    RateLimited(u64),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            ApiError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            ApiError::Engine(err) => {
                let code = err.code();
                let status = match err {
                    EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                    EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                    EngineError::WalletBusy => StatusCode::CONFLICT,
                    EngineError::InsufficientFunds(_)
                    | EngineError::UnsupportedPoolType(_)
                    | EngineError::PoolPaused(_)
                    | EngineError::SlippageExhausted { .. }
                    | EngineError::SignRefused(_)
                    | EngineError::UnknownProgramError(_) => StatusCode::BAD_REQUEST,
                    EngineError::SlippageExceeded { .. } => StatusCode::CONFLICT,
                    EngineError::OracleUnreliable(_) => StatusCode::BAD_GATEWAY,
                    EngineError::VenueUnavailable(_)
                    | EngineError::RpcUnavailable(_)
                    | EngineError::BundleDropped(_)
                    | EngineError::BundleTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                    EngineError::Internal(_) => StatusCode::BAD_GATEWAY,
                };
                (status, code)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Engine(err) => err.to_string(),
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::RateLimited(retry_after) => format!("too many login attempts, retry after {retry_after}s"),
        };
        let (status, code) = self.status_and_code();

        (status, axum::Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Engine(EngineError::Internal(format!("{err:#}")))
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Engine(EngineError::Internal(format!("db: {err}")))
    }
}
