//! Operator register/login for the demonstration API. Operators are not
//! wallets — they are human API callers whose bearer token protects the
//! mutating `Worker`/`DCA` endpoints.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth;
use crate::api::error::ApiError;
use crate::api::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub username: String,
}

pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<Json<RegisterResponse>, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest("username must be 3-32 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let operator_id = Uuid::new_v4().to_string();

    let db = state.db.lock().await;

    let existing: Option<String> = db
        .query_row("SELECT id FROM operators WHERE username = ?1", [&req.username], |row| row.get(0))
        .ok();
    if existing.is_some() {
        return Err(ApiError::BadRequest("username already taken".into()));
    }

    db.execute(
        "INSERT INTO operators (id, username, password_hash) VALUES (?1, ?2, ?3)",
        rusqlite::params![operator_id, req.username, password_hash],
    )?;

    Ok(Json(RegisterResponse { ok: true, username: req.username }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub operator_id: String,
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    state.rate_limiter.check(&req.username).await.map_err(ApiError::RateLimited)?;

    let db = state.db.lock().await;

    let row: Option<(String, String)> = db
        .query_row(
            "SELECT id, password_hash FROM operators WHERE username = ?1",
            [&req.username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .ok();

    let (operator_id, password_hash) = row.ok_or_else(|| ApiError::Unauthorized("invalid username or password".into()))?;

    if !auth::verify_password(&req.password, &password_hash) {
        return Err(ApiError::Unauthorized("invalid username or password".into()));
    }

    let token = auth::create_jwt(&operator_id, &state.auth_secret)?;
    Ok(Json(LoginResponse { token, operator_id }))
}
