use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::{blocking, ApiError, AppState};
use crate::store::User;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Issues and checks HS256 access tokens carrying the user's email as `sub`.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        let claims = Claims { sub: email.to_string(), exp: (Utc::now() + self.ttl).timestamp() };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Returns the email in `sub` for a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims.sub)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Six-digit numeric one-time password.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

pub fn otp_expiry(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    now + Duration::minutes(minutes)
}

#[derive(Debug, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    AlreadyVerified,
    Expired,
    Mismatch,
}

pub fn check_otp(user: &User, submitted: &str, now: DateTime<Utc>) -> OtpCheck {
    if user.is_verified {
        return OtpCheck::AlreadyVerified;
    }
    match user.otp_expires_at {
        Some(exp) if exp >= now => {}
        _ => return OtpCheck::Expired,
    }
    match user.otp_secret.as_deref() {
        Some(secret) if secret == submitted.trim() => OtpCheck::Valid,
        _ => OtpCheck::Mismatch,
    }
}

/// The authenticated caller, resolved from `Authorization: Bearer <jwt>`.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;
        let email = state.tokens.verify(token.trim()).map_err(|_| ApiError::Unauthorized)?;
        let store = state.store.clone();
        let user = blocking(move || Ok(store.user_by_email(&email)?)).await?.ok_or(ApiError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(verified: bool, otp: Option<&str>, expires: Option<DateTime<Utc>>) -> User {
        User {
            id: "u1".into(),
            name: "Asha".into(),
            email: "a@example.com".into(),
            age: None,
            profession: None,
            password_hash: String::new(),
            is_verified: verified,
            otp_secret: otp.map(String::from),
            otp_expires_at: expires,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let h = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &h));
        assert!(!verify_password("hunter23", &h));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn token_roundtrip_and_tamper() {
        let issuer = TokenIssuer::new("secret", 30);
        let t = issuer.issue("a@example.com").unwrap();
        assert_eq!(issuer.verify(&t).unwrap(), "a@example.com");
        assert!(TokenIssuer::new("other", 30).verify(&t).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("secret", -10);
        let t = issuer.issue("a@example.com").unwrap();
        assert!(issuer.verify(&t).is_err());
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let n: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn otp_rules() {
        let now = Utc::now();
        let later = otp_expiry(now, 10);
        assert_eq!(check_otp(&user(false, Some("123456"), Some(later)), "123456", now), OtpCheck::Valid);
        assert_eq!(check_otp(&user(false, Some("123456"), Some(later)), "654321", now), OtpCheck::Mismatch);
        assert_eq!(check_otp(&user(true, None, None), "123456", now), OtpCheck::AlreadyVerified);
        let past = now - Duration::minutes(1);
        assert_eq!(check_otp(&user(false, Some("123456"), Some(past)), "123456", now), OtpCheck::Expired);
        assert_eq!(check_otp(&user(false, Some("123456"), None), "123456", now), OtpCheck::Expired);
    }
}
