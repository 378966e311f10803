use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Payload failed declarative validation - safe to show
    Validation(garde::Report),
    /// A single field was rejected - message is safe to show
    Field {
        status: StatusCode,
        field: &'static str,
        message: String,
    },
}

impl AppError {
    /// Field-scoped 400.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Field {
            status: StatusCode::BAD_REQUEST,
            field,
            message: message.into(),
        }
    }

    /// The identity doesn't belong to any account.
    pub fn unknown_account(email: &str) -> Self {
        Self::Field {
            status: StatusCode::NOT_FOUND,
            field: "email",
            message: format!("No user {} was found.", email),
        }
    }
}

/// Body of every validation-style rejection: a flat list for display, and the
/// same messages grouped by the (camelCase) field they concern.
#[derive(Debug, Default, Serialize)]
struct ErrorBody {
    errors: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    fn push(&mut self, field: String, message: String) {
        self.errors.push(message.clone());
        self.fields.entry(field).or_default().push(message);
    }
}

fn camel_case(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut upper = false;
    for c in path.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::External(status, msg) => (status, msg).into_response(),
            AppError::Validation(report) => {
                let mut body = ErrorBody::default();
                for (path, error) in report.iter() {
                    body.push(camel_case(&path.to_string()), error.to_string());
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            AppError::Field {
                status,
                field,
                message,
            } => {
                let mut body = ErrorBody::default();
                body.push(field.to_string(), message);
                (status, Json(body)).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
