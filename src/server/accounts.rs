//! Signup, login and email verification.

use axum::extract::State;
use axum::{Form, Json};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::{blocking, AppState};
use crate::auth::{check_otp, generate_otp, hash_password, otp_expiry, verify_password, CurrentUser, OtpCheck};
use crate::store::{NewUser, User};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub age: Option<i64>,
    pub profession: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerify {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtp {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: &'static str,
}

impl Token {
    fn bearer(access_token: String) -> Self {
        Self { access_token, token_type: "bearer" }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).map(|re| re.is_match(email)).unwrap_or(false)
}

async fn find_user(state: &AppState, email: &str) -> ApiResult<Option<User>> {
    let (store, email) = (state.store.clone(), normalize_email(email));
    blocking(move || Ok(store.user_by_email(&email)?)).await
}

pub async fn signup(State(state): State<AppState>, Json(req): Json<SignupRequest>) -> ApiResult<Json<User>> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email address".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".into()));
    }
    if find_user(&state, &email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".into()));
    }

    let otp = generate_otp();
    let new_user = NewUser {
        name: req.name.trim().to_string(),
        email,
        age: req.age,
        profession: req.profession,
        password_hash: String::new(),
        otp_secret: otp.clone(),
        otp_expires_at: otp_expiry(Utc::now(), state.config.otp_minutes),
    };
    let store = state.store.clone();
    let password = req.password;
    let user = blocking(move || {
        let password_hash = hash_password(&password)?;
        Ok(store.create_user(NewUser { password_hash, ..new_user })?)
    })
    .await?;
    tracing::info!(user_id = %user.id, "user signed up");

    // The account exists either way; the user can ask for a new code.
    if let Err(e) = state.mailer.send_otp(&user.email, &otp, state.config.otp_minutes).await {
        tracing::warn!(email = %user.email, error = %e, "could not send verification email");
    }
    Ok(Json(user))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> ApiResult<Json<Token>> {
    let (store, email) = (state.store.clone(), normalize_email(&form.username));
    let user = blocking(move || {
        Ok(store.user_by_email(&email)?.filter(|u| verify_password(&form.password, &u.password_hash)))
    })
    .await?
    .ok_or(ApiError::InvalidCredentials)?;
    if !user.is_verified {
        return Err(ApiError::Forbidden("Email not verified. Please check your inbox for an OTP.".into()));
    }
    Ok(Json(Token::bearer(state.tokens.issue(&user.email)?)))
}

pub async fn verify_otp(State(state): State<AppState>, Json(req): Json<OtpVerify>) -> ApiResult<Json<Token>> {
    let user = find_user(&state, &req.email).await?.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    match check_otp(&user, &req.otp, Utc::now()) {
        OtpCheck::Valid => {}
        OtpCheck::AlreadyVerified => return Err(ApiError::BadRequest("Account already verified".into())),
        OtpCheck::Expired => return Err(ApiError::BadRequest("OTP has expired".into())),
        OtpCheck::Mismatch => return Err(ApiError::BadRequest("Invalid OTP".into())),
    }

    let (store, user_id) = (state.store.clone(), user.id.clone());
    blocking(move || Ok(store.mark_verified(&user_id)?)).await?;
    tracing::info!(user_id = %user.id, "email verified");
    Ok(Json(Token::bearer(state.tokens.issue(&user.email)?)))
}

pub async fn resend_otp(State(state): State<AppState>, Json(req): Json<ResendOtp>) -> ApiResult<Json<Value>> {
    let user = find_user(&state, &req.email).await?.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if user.is_verified {
        return Err(ApiError::BadRequest("Account is already verified".into()));
    }

    let otp = generate_otp();
    let expires_at = otp_expiry(Utc::now(), state.config.otp_minutes);
    let (store, user_id, code) = (state.store.clone(), user.id.clone(), otp.clone());
    blocking(move || Ok(store.set_otp(&user_id, &code, expires_at)?)).await?;
    state
        .mailer
        .send_otp(&user.email, &otp, state.config.otp_minutes)
        .await
        .map_err(|e| ApiError::Internal(format!("Could not send verification email: {e}")))?;
    Ok(Json(json!({ "message": "A new OTP has been sent to your email address." })))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("asha@example.com"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("asha example@x.com"));
        assert!(!is_valid_email(""));
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }
}
