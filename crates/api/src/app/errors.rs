use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gatehouse_core::AuthError;

/// Map an auth-domain error to an HTTP response.
///
/// `AuthenticationFailed` and the two consume-flow failures share 401 so
/// that callers cannot distinguish which check rejected them.
pub fn auth_error_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        AuthError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AuthError::AuthenticationFailed => authentication_failed(),
        AuthError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        AuthError::PasswordResetFailed => json_error(
            StatusCode::UNAUTHORIZED,
            "password_reset_failed",
            "password reset failed",
        ),
        AuthError::EmailVerificationFailed => json_error(
            StatusCode::UNAUTHORIZED,
            "email_verification_failed",
            "email verification failed",
        ),
        AuthError::Store(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// The uniform 401 used for every authentication failure.
pub fn authentication_failed() -> axum::response::Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "authentication_failed",
        "please authenticate",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
