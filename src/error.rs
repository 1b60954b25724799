use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::jwt::TokenError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid Google token")]
    InvalidExternalToken,

    #[error("Account is linked to another identity")]
    IdentityConflict,

    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid token")]
    TokenNotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid access token: {0}")]
    Token(#[from] TokenError),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Validation(errors) => {
                let body = json!({
                    "error": "validation_error",
                    "message": self.to_string(),
                    "errors": field_messages(errors),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::DuplicateEmail => {
                (StatusCode::BAD_REQUEST, "duplicate_email", self.to_string())
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", self.to_string())
            }
            AppError::InvalidExternalToken => {
                (StatusCode::UNAUTHORIZED, "invalid_external_token", self.to_string())
            }
            AppError::IdentityConflict => {
                (StatusCode::CONFLICT, "identity_conflict", self.to_string())
            }
            AppError::InvalidOrExpiredToken => {
                (StatusCode::UNAUTHORIZED, "invalid_refresh_token", self.to_string())
            }
            AppError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "user_not_found", self.to_string())
            }
            AppError::TokenNotFound => {
                (StatusCode::BAD_REQUEST, "invalid_token", self.to_string())
            }
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            AppError::Token(e) => {
                tracing::debug!("Rejected access token: {e}");
                (StatusCode::UNAUTHORIZED, "invalid_token", "Invalid token".to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error".to_string())
            }
        };

        let body = json!({
            "error": error_type,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Flattens validator output into `{field: [message, ...]}`, keyed by the
/// camelCase names clients send.
fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (camel_case(field), messages)
        })
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_are_camel_cased() {
        assert_eq!(camel_case("refresh_token"), "refreshToken");
        assert_eq!(camel_case("google_token"), "googleToken");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::DuplicateEmail, StatusCode::BAD_REQUEST),
            (AppError::TokenNotFound, StatusCode::BAD_REQUEST),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::IdentityConflict, StatusCode::CONFLICT),
            (AppError::InvalidOrExpiredToken, StatusCode::UNAUTHORIZED),
            (AppError::UserNotFound, StatusCode::UNAUTHORIZED),
            (AppError::Token(TokenError::Expired), StatusCode::UNAUTHORIZED),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
