use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse,
            MessageResponse, PublicUser, RegisterRequest, UpdatePasswordRequest, VerifyEmailQuery,
        },
        extractors::AuthUser,
        jwt::{JwtKeys, TokenKind},
        password::{hash_password, verify_password},
        repo::is_unique_violation,
        repo_types::{NewUser, User},
    },
    email::{reset_email, verification_email},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", put(register))
        .route("/login", post(login))
        .route("/verify-email", get(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/updatePassword", post(update_password))
        .route("/signout", post(signout))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Names of the fields that are absent, in declaration order.
fn missing_fields<'a>(fields: &[(&'a str, bool)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect()
}

/// Hex SHA-256 of a reset code; the digest travels inside the signed reset
/// token so the raw code only ever exists in the email and on the client.
fn code_digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn new_reset_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let missing = missing_fields(&[
        ("email", payload.email.is_some()),
        ("password", payload.password.is_some()),
        ("age", payload.age.is_some()),
        ("first name", payload.fname.is_some()),
        ("last name", payload.lname.is_some()),
    ]);
    if !missing.is_empty() {
        warn!(missing = ?missing, "register missing fields");
        return Err(AppError::Validation(format!(
            "Missing fields: {}",
            missing.join(", ")
        )));
    }

    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();
    let (age, fname, lname) = (
        payload.age.unwrap_or_default(),
        payload.fname.unwrap_or_default(),
        payload.lname.unwrap_or_default(),
    );

    if !is_valid_email(&email) {
        warn!(email = %email, "register invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let hash = hash_password(&password)?;

    // The unique index on email decides duplicate registrations, so two
    // concurrent attempts can never both insert.
    let user = User::create(
        &state.db,
        NewUser {
            email: &email,
            password_hash: &hash,
            age,
            fname: &fname,
            lname: &lname,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            warn!(email = %email, "register duplicate email");
            AppError::Conflict("User with this email already exists.".into())
        } else {
            AppError::Db(e)
        }
    })?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_verify_email(user.id)?;
    let link = format!(
        "{}/users/verify-email?token={}",
        state.config.server_host, token
    );
    let (subject, body) = verification_email(&user.fname, &link);
    state
        .mailer
        .send(&user.email, &subject, &body)
        .await
        .map_err(|e| AppError::Internal(e.context("send verification email")))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully. A verification email has been sent to your email address.".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(e), Some(p)) => (e.trim().to_lowercase(), p),
        _ => {
            warn!("login missing fields");
            return Err(AppError::Validation(
                "Email and password are required".into(),
            ));
        }
    };

    let mut user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            AppError::Validation("Invalid email or password".into())
        })?;

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Forbidden("Invalid email or password".into()));
    }

    if !user.is_verified {
        warn!(email = %email, user_id = %user.id, "login before verification");
        return Err(AppError::Forbidden(
            "Please verify your email address".into(),
        ));
    }

    User::set_logged_in(&state.db, user.id, true).await?;
    user.is_logged_in = true;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        user: PublicUser::from(user),
        token,
    }))
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Html<&'static str>> {
    let token = query
        .token
        .ok_or_else(|| AppError::Validation("Missing verification token.".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&token, TokenKind::VerifyEmail)
        .map_err(|_| {
            warn!("verify-email bad token");
            AppError::Validation("Invalid or expired token.".into())
        })?;

    // Re-verifying an already verified address is a no-op.
    let user = User::mark_verified(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Validation("Email verification failed.".into()))?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Html(
        "<h1>Email Verified</h1><p>Your email has been successfully verified.</p>",
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("Email is required".into()))?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "forgot-password unknown email");
            AppError::NotFound("No account with this email address".into())
        })?;

    let code = new_reset_code();
    let keys = JwtKeys::from_ref(&state);
    let reset_token = keys.sign_reset(user.id, code_digest(&code))?;

    let (subject, body) = reset_email(&user.fname, &code);
    state
        .mailer
        .send(&user.email, &subject, &body)
        .await
        .map_err(|e| AppError::Internal(e.context("send reset email")))?;

    info!(user_id = %user.id, "reset code issued");
    Ok(Json(ForgotPasswordResponse {
        message: "A reset code has been sent to your email address.".into(),
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (token, code, password) = match (payload.token, payload.code, payload.password) {
        (Some(t), Some(c), Some(p)) => (t, c, p),
        _ => {
            return Err(AppError::Validation(
                "Token, code and new password are required".into(),
            ))
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&token, TokenKind::PasswordReset)
        .map_err(|_| {
            warn!("updatePassword bad reset token");
            AppError::Validation("Invalid or expired reset token".into())
        })?;

    let expected = claims
        .code_hash
        .ok_or_else(|| AppError::Validation("Invalid or expired reset token".into()))?;
    if code_digest(&code) != expected {
        warn!(user_id = %claims.sub, "updatePassword wrong code");
        return Err(AppError::Validation("Incorrect reset code".into()));
    }

    let hash = hash_password(&password)?;
    let updated = User::update_password(&state.db, claims.sub, &hash).await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }

    info!(user_id = %claims.sub, "password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully.".into(),
    }))
}

#[instrument(skip(state))]
pub async fn signout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    User::set_logged_in(&state.db, user_id, false).await?;
    info!(user_id = %user_id, "user signed out");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_names_each_absent_field_in_order() {
        let missing = missing_fields(&[
            ("email", false),
            ("password", true),
            ("age", false),
            ("first name", true),
            ("last name", false),
        ]);
        assert_eq!(missing, vec!["email", "age", "last name"]);

        let none = missing_fields(&[("email", true), ("password", true)]);
        assert!(none.is_empty());
    }

    #[test]
    fn reset_codes_are_six_digits() {
        for _ in 0..100 {
            let code = new_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_digest_is_stable_hex_sha256() {
        let a = code_digest("042137");
        let b = code_digest("042137");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, code_digest("042138"));
    }

    #[test]
    fn email_regex_accepts_plain_addresses_only() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }
}
