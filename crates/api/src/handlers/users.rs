//! The signed-in user's own account: `GET`, `PATCH` and `DELETE /users/settings`.

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use garde::Validate;
use shared::api::{UpdateSettingsPayload, UserSettings};

use crate::{error::AppError, middleware::auth::AuthUser, models::User, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/settings",
        get(get_settings).patch(update_settings).delete(delete_account),
    )
}

fn settings(user: User) -> UserSettings {
    UserSettings {
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

#[debug_handler(state = AppState)]
async fn get_settings(auth: AuthUser) -> Json<UserSettings> {
    Json(settings(auth.user))
}

#[debug_handler]
async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::Validation)?;

    let user = state
        .repos
        .users
        .update_profile(auth.user.id, &payload)
        .await?;

    Ok(Json(settings(user)))
}

#[debug_handler]
async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.repos.users.delete(auth.user.id).await?;

    tracing::info!(user_id = auth.user.id, email = %auth.user.email, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}
