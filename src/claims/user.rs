use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::ApiError;
use crate::models::User;
use crate::AppState;

#[derive(Serialize, Deserialize, Clone)]
pub struct UserClaim {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub exp: i64,
}

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl UserClaim {
    pub fn new(user: &User, valid_days: u64) -> UserClaim {
        UserClaim {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            exp: unix_now() + (valid_days * SECONDS_PER_DAY) as i64,
        }
    }

    pub fn encode(&self, secret: &str) -> Result<String, ApiError> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(|e| ApiError::Internal(format!("couldn't sign token: {}", e)))
    }

    pub fn decode(token: &str, secret: &str) -> Result<UserClaim, ApiError> {
        decode::<UserClaim>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Access + refresh token pair for a freshly authenticated user.
pub fn issue_token_pair(user: &User, config: &Config) -> Result<(String, String), ApiError> {
    let access = UserClaim::new(user, config.access_token_days).encode(&config.jwt_secret)?;
    let refresh =
        UserClaim::new(user, config.refresh_token_days).encode(&config.jwt_refresh_secret)?;
    Ok((access, refresh))
}

pub fn claim_from_request(req: &HttpRequest) -> Result<UserClaim, ApiError> {
    // CheckLogin already decoded the token for gated scopes
    if let Some(claim) = req.extensions().get::<UserClaim>() {
        return Ok(claim.clone());
    }

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state missing".to_string()))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

    UserClaim::decode(token, &state.config.jwt_secret)
}

impl FromRequest for UserClaim {
    type Error = ApiError;
    type Future = Ready<Result<UserClaim, ApiError>>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claim_from_request(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(exp: i64) -> UserClaim {
        UserClaim {
            id: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            exp,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let token = claim(unix_now() + 3600).encode("secret").unwrap();
        let decoded = UserClaim::decode(&token, "secret").unwrap();
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.username, "ada");
        assert_eq!(decoded.email, "ada@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = claim(unix_now() + 3600).encode("secret").unwrap();
        assert!(UserClaim::decode(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = claim(unix_now() - 3600).encode("secret").unwrap();
        assert!(UserClaim::decode(&token, "secret").is_err());
    }
}
