use axum::extract::FromRequestParts;
use axum::http::HeaderValue;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;

pub struct AuthOperator {
    pub operator_id: String,
}

impl FromRequestParts<AppState> for AuthOperator {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("invalid authorization format".into()))?;

        let claims = super::auth::verify_jwt(token, &state.auth_secret)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

        Ok(AuthOperator { operator_id: claims.sub })
    }
}

/// Mints a short request ID when the caller didn't send one, and echoes
/// it back on `X-Request-ID`.
pub async fn request_id(mut req: axum::extract::Request, next: Next) -> Response {
    let incoming = req.headers().get("x-request-id").and_then(|v| v.to_str().ok()).map(str::to_string);
    let request_id = incoming.unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..12].to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

#[derive(Clone)]
pub struct RequestId(pub String);
