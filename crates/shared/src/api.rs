//! Shared API request/response types used by the tunes API server and its clients.
//!
//! All bodies use camelCase field names on the wire.

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Shortest password accepted on signup or reset.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest password accepted on signup or reset.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Create an account with an email and password.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = MIN_PASSWORD_LEN, max = MAX_PASSWORD_LEN))]
    pub password: String,
    #[garde(matches(password))]
    pub confirmation_password: String,
}

/// Returned after a successful signup: the account plus a fresh token pair.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub email: String,
    pub access: String,
    pub refresh: String,
}

/// Exchange email and password for a token pair.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Access and refresh tokens. Send the access token as `Authorization: Bearer <access>`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Exchange a refresh token for a new access token.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    #[garde(length(min = 1))]
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Change the signed-in user's password.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOwnPasswordPayload {
    #[garde(length(min = 1))]
    pub password: String,
    #[garde(length(min = MIN_PASSWORD_LEN, max = MAX_PASSWORD_LEN))]
    pub new_password: String,
    #[garde(matches(new_password))]
    pub confirmation_password: String,
}

/// Longest first or last name.
pub const MAX_NAME_LEN: usize = 150;

/// Profile of the signed-in user.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial profile update. Absent fields are left alone; the email is read-only.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsPayload {
    #[garde(length(max = MAX_NAME_LEN))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[garde(length(max = MAX_NAME_LEN))]
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Query string of `GET /auth/reset-password`: where to send the reset code.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetCodeQuery {
    #[garde(email)]
    pub email: String,
}

/// Exchange an emailed reset code for a password-reset session token.
///
/// The code's shape (4 digits) is checked by the server after the account
/// lookup, so a malformed code is reported against the `code` field.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCodePayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub code: String,
}

/// Returned after a reset code was redeemed. Valid for 10 minutes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCodeResponse {
    pub session_token: String,
}

/// Set a new password using a session token obtained from a reset code.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub session_token: String,
    #[garde(length(min = MIN_PASSWORD_LEN, max = MAX_PASSWORD_LEN))]
    pub new_password: String,
    #[garde(matches(new_password))]
    pub confirmation_password: String,
}

/// Generic confirmation message.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: String,
}

/// Plain informational message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
