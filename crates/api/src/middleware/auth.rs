//! Authentication using access tokens issued at login or signup.
//!
//! Usage: Add `AuthUser` as an extractor parameter to require authentication.
//! Both `Authorization: Bearer <token>` and `Authorization: JWT <token>` are
//! accepted.
//!
//! ```ignore
//! async fn my_handler(auth: AuthUser, ...) -> ... {
//!     // auth.user is the current, active user
//! }
//! ```

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{error::AppError, models::User, services::TokenKind, state::AppState};

const AUTH_SCHEMES: [&str; 2] = ["Bearer", "JWT"];

/// Authenticated user extracted from a valid access token.
/// Loaded fresh on every request, so deleted or deactivated accounts are refused.
pub struct AuthUser {
    pub user: User,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !AUTH_SCHEMES.contains(&scheme) {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;

        let user_id = state
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(|e| {
                tracing::debug!("access token rejected: {:?}", e);
                AuthError::InvalidToken
            })?;

        let user = state
            .repos
            .users
            .find_by_id(user_id)
            .await
            .map_err(AuthError::Internal)?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser { user })
    }
}

pub enum AuthError {
    MissingToken,
    InvalidToken,
    Internal(anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::Internal(e) => return AppError::Internal(e).into_response(),
        };

        let body = serde_json::json!({ "errors": [message], "fields": {} });

        (status, Json(body)).into_response()
    }
}
