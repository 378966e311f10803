//! Signup, login, password changes and the forgotten-password flow.
//!
//! Signup and `POST /auth/get-token` hand out an access/refresh token pair.
//! `POST /auth/refresh-token` trades a refresh token for a new access token.
//! `PATCH /auth/change-password` needs an access token and the old password.
//!
//! Forgotten-password flow:
//! 1. `GET /auth/reset-password?email=` - a 4-digit code is issued (or the live
//!    one reused) and emailed. It expires after 2 minutes.
//! 2. `POST /auth/reset-password` with email + code - the code is redeemed and a
//!    32-character session token is returned. It expires after 10 minutes.
//! 3. `PATCH /auth/reset-password` with email + session token + new password -
//!    the token is redeemed and the password replaced.
//!
//! Security notes:
//! - Codes and tokens are single-use: redemption is an atomic compare-and-delete
//! - A wrong code leaves the live code usable until it expires
//! - Malformed codes/tokens are rejected before any redemption attempt
//! - Expired and wrong secrets get the same response
//! - Code requests and redemption attempts are rate limited per email; with only
//!   10 000 possible codes, the redemption cap is what stops brute force
//! - Unknown emails get a 404, so this flow does reveal whether an account exists
//!
//! Emails are normalized (trimmed, domain lowercased) before validation, so
//! padded input is accepted and every step keys on the same identity.

use std::time::Duration;

use axum::{
    Json, Router, debug_handler,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use garde::Validate;
use shared::api::{
    AccessTokenResponse, ChangeOwnPasswordPayload, ChangePasswordPayload, LoginPayload,
    MessageResponse, RedeemCodePayload, RedeemCodeResponse, RefreshTokenPayload, ResetCodeQuery,
    SignupPayload, SignupResponse, SuccessResponse, TokenPairResponse,
};

use crate::{
    crypto::{hash_password, verify_password},
    error::AppError,
    identity::normalize_email,
    middleware::auth::AuthUser,
    models::User,
    services::TokenKind,
    state::AppState,
    stores::Purpose,
};

/// Reset code requests per email per hour.
const CODE_REQUEST_LIMIT: i64 = 5;
const CODE_REQUEST_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Code or token redemption attempts per email per 15 minutes.
const REDEEM_LIMIT: i64 = 10;
const REDEEM_WINDOW: Duration = Duration::from_secs(15 * 60);
/// Login attempts per email per 15 minutes.
const LOGIN_LIMIT: i64 = 10;
const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/get-token", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", patch(change_own_password))
        .route(
            "/reset-password",
            get(send_reset_code)
                .post(redeem_reset_code)
                .patch(change_password),
        )
}

async fn enforce_rate_limit(
    state: &AppState,
    key: String,
    limit: i64,
    window: Duration,
    message: &'static str,
) -> Result<(), AppError> {
    let result = state.stores.rate_limiter.check(&key, limit, window).await?;

    if !result.is_allowed() {
        tracing::warn!(key = %key, "rate limit exceeded");
        return Err(AppError::External(StatusCode::TOO_MANY_REQUESTS, message));
    }

    Ok(())
}

async fn find_account(state: &AppState, email: &str) -> Result<User, AppError> {
    state
        .repos
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::unknown_account(email))
}

fn email_taken() -> AppError {
    AppError::field("email", "A user with this email already exists.")
}

#[debug_handler]
async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    payload.validate().map_err(AppError::Validation)?;

    let email = payload.email;

    if state.repos.users.find_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .repos
        .users
        .create(&email, &password_hash)
        .await?
        .ok_or_else(email_taken)?;

    let tokens = state.tokens.issue_pair(user.id)?;

    tracing::info!(user_id = user.id, email = %user.email, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            email: user.email,
            access: tokens.access,
            refresh: tokens.refresh,
        }),
    ))
}

#[debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    payload.validate().map_err(AppError::Validation)?;

    let email = payload.email;

    enforce_rate_limit(
        &state,
        format!("ratelimit:login:{}", email),
        LOGIN_LIMIT,
        LOGIN_WINDOW,
        "Too many login attempts. Try again later.",
    )
    .await?;

    let user = match state.repos.users.find_by_email(&email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::External(StatusCode::UNAUTHORIZED, BAD_CREDENTIALS)),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(email = %email, "login rejected");
        return Err(AppError::External(StatusCode::UNAUTHORIZED, BAD_CREDENTIALS));
    }

    let tokens = state.tokens.issue_pair(user.id)?;

    tracing::info!(user_id = user.id, email = %email, "user logged in");

    Ok(Json(TokenPairResponse {
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

#[debug_handler]
async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::Validation)?;

    let user_id = state
        .tokens
        .verify(&payload.refresh, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!("refresh token rejected: {:?}", e);
            AppError::External(StatusCode::UNAUTHORIZED, "Token is invalid or expired")
        })?;

    let access = state.tokens.issue(user_id, TokenKind::Access)?;

    Ok(Json(AccessTokenResponse { access }))
}

#[debug_handler]
async fn change_own_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangeOwnPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::Validation)?;

    let user = auth.user;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::field("password", "Old password is incorrect!"));
    }

    if verify_password(&payload.new_password, &user.password_hash)? {
        return Err(AppError::field(
            "newPassword",
            "Changing to the same password is not allowed!",
        ));
    }

    let password_hash = hash_password(&payload.new_password)?;
    state
        .repos
        .users
        .update_password(user.id, &password_hash)
        .await?;

    tracing::info!(user_id = user.id, "password changed");

    Ok(Json(MessageResponse {
        message: "Successfully changed password.".to_string(),
    }))
}

#[debug_handler]
async fn send_reset_code(
    State(state): State<AppState>,
    Query(mut query): Query<ResetCodeQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.email = normalize_email(&query.email);
    query.validate().map_err(AppError::Validation)?;

    let email = query.email;

    enforce_rate_limit(
        &state,
        format!("ratelimit:reset-code:{}", email),
        CODE_REQUEST_LIMIT,
        CODE_REQUEST_WINDOW,
        "Too many reset code requests. Try again later.",
    )
    .await?;

    let user = find_account(&state, &email).await?;

    let code = state
        .stores
        .credentials
        .get_or_create(&user.email, Purpose::ResetCode)
        .await?;

    if let Err(e) = state.email.send_reset_code(&user.email, &code).await {
        if state.config.strict_email_delivery {
            return Err(AppError::Internal(e.context("failed to send reset code")));
        }
        tracing::warn!(email = %user.email, "failed to send reset code: {:?}", e);
    }

    tracing::info!(email = %user.email, "reset code requested");

    Ok(Json(SuccessResponse {
        success: format!("Successfully sent a reset code to {}.", user.email),
    }))
}

#[debug_handler]
async fn redeem_reset_code(
    State(state): State<AppState>,
    Json(mut payload): Json<RedeemCodePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    payload.validate().map_err(AppError::Validation)?;

    let email = payload.email.as_str();

    enforce_rate_limit(
        &state,
        format!("ratelimit:reset-verify:{}", email),
        REDEEM_LIMIT,
        REDEEM_WINDOW,
        "Too many verification attempts. Try again later.",
    )
    .await?;

    let user = find_account(&state, email).await?;

    if !Purpose::ResetCode.is_well_formed(&payload.code) {
        return Err(AppError::field("code", "Invalid code provided."));
    }

    let redeemed = state
        .stores
        .credentials
        .try_redeem(&user.email, Purpose::ResetCode, &payload.code)
        .await?;

    if !redeemed {
        tracing::warn!(email = %user.email, "reset code rejected");
        return Err(AppError::field(
            "code",
            "Code has expired or it is incorrect.",
        ));
    }

    let session_token = state
        .stores
        .credentials
        .get_or_create(&user.email, Purpose::SessionToken)
        .await?;

    tracing::info!(email = %user.email, "reset code redeemed");

    Ok(Json(RedeemCodeResponse { session_token }))
}

#[debug_handler]
async fn change_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    // Password rules are checked first so a typo doesn't burn the token
    payload.email = normalize_email(&payload.email);
    payload.validate().map_err(AppError::Validation)?;

    let email = payload.email.as_str();

    enforce_rate_limit(
        &state,
        format!("ratelimit:reset-token:{}", email),
        REDEEM_LIMIT,
        REDEEM_WINDOW,
        "Too many password reset attempts. Try again later.",
    )
    .await?;

    let user = find_account(&state, email).await?;

    if !Purpose::SessionToken.is_well_formed(&payload.session_token) {
        return Err(AppError::field(
            "sessionToken",
            "Invalid session token provided.",
        ));
    }

    let redeemed = state
        .stores
        .credentials
        .try_redeem(&user.email, Purpose::SessionToken, &payload.session_token)
        .await?;

    if !redeemed {
        tracing::warn!(email = %user.email, "session token rejected");
        return Err(AppError::field(
            "sessionToken",
            "Session token has expired or it is incorrect.",
        ));
    }

    let password_hash = hash_password(&payload.new_password)?;
    state
        .repos
        .users
        .update_password(user.id, &password_hash)
        .await?;

    tracing::info!(user_id = user.id, email = %user.email, "password reset");

    Ok(Json(SuccessResponse {
        success: format!("Successfully changed password for {}.", user.email),
    }))
}
