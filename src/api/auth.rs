//! Operator authentication for the demonstration API: bcrypt-hashed
//! passwords, JWT bearer sessions. This crate never custodies wallet
//! private keys — that is the external custody oracle's job — so there
//! is no password-derived symmetric key or encrypted-private-key-at-rest
//! scheme here.

use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const JWT_EXPIRY_DAYS: i64 = 7;

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, 12).context("hashing password")
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn create_jwt(operator_id: &str, secret: &str) -> Result<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(JWT_EXPIRY_DAYS)).timestamp() as usize;
    let claims = Claims { sub: operator_id.to_string(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).context("creating jwt")
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .context("invalid token")?;
    Ok(data.claims)
}
