//! Registration, login/logout, password reset, email verification.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use gatehouse_auth::{OpaqueToken, Role, User};
use gatehouse_core::UserId;

use crate::app::dto::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    SessionBody, TokenQuery, UserBody,
};
use crate::app::{errors, AppServices};
use crate::context::{AuthContext, BearerToken};

pub fn public_router() -> Router {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/forgot-password", post(forgot_password))
        .route("/v1/auth/reset-password", post(reset_password))
        .route("/v1/auth/verify-email", post(verify_email))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/v1/auth/logout", post(logout))
        .route(
            "/v1/auth/send-verification-email",
            post(send_verification_email),
        )
}

/// POST /v1/auth/register — create an account and open a session.
async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    let email = body.email.trim().to_lowercase();

    let password_hash = match services.passwords.hash(&body.password) {
        Ok(hash) => hash,
        Err(err) => return errors::auth_error_response(err.into()),
    };

    let user = User {
        id: UserId::new(),
        email,
        name: body.name,
        role: Role::new("user"),
        password_hash,
        email_verified: false,
    };

    if let Err(err) = services.users.create(user.clone()).await {
        return errors::auth_error_response(err.into());
    }

    let issued = match services.sessions.issue(user.id).await {
        Ok(issued) => issued,
        Err(err) => return errors::auth_error_response(err),
    };

    // Kick off verification. A mail hiccup does not undo the registration;
    // the user can request another mail once logged in.
    match services.purpose.issue_verify_token(user.id).await {
        Ok(token) => {
            if let Err(err) = services
                .mailer
                .send_verification_email(&user.email, &token)
                .await
            {
                tracing::warn!(error = %err, "verification email not delivered");
            }
        }
        Err(err) => tracing::warn!(error = %err, "verification token not issued"),
    }

    (
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserBody::from(&user),
            session: SessionBody::from(&issued),
        }),
    )
        .into_response()
}

/// POST /v1/auth/login — email + password, uniform 401 on any failure.
async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let email = body.email.trim().to_lowercase();

    let user = match services.users.get_by_email(&email).await {
        Ok(user) => user,
        Err(err) => return errors::auth_error_response(err.into()),
    };

    // One rejection path for "no such user" and "wrong password".
    let Some(user) = user else {
        return errors::authentication_failed();
    };
    if !services.passwords.verify(&body.password, &user.password_hash) {
        return errors::authentication_failed();
    }

    let issued = match services.sessions.issue(user.id).await {
        Ok(issued) => issued,
        Err(err) => return errors::auth_error_response(err),
    };

    (
        StatusCode::OK,
        Json(AuthResponse {
            user: UserBody::from(&user),
            session: SessionBody::from(&issued),
        }),
    )
        .into_response()
}

/// POST /v1/auth/logout — revoke the presented session.
async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> axum::response::Response {
    match services.sessions.invalidate(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::auth_error_response(err),
    }
}

/// POST /v1/auth/forgot-password — issue a reset token and mail it.
async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> axum::response::Response {
    let email = body.email.trim().to_lowercase();

    let token = match services.purpose.issue_reset_token(&email).await {
        Ok(token) => token,
        Err(err) => return errors::auth_error_response(err),
    };

    if let Err(err) = services
        .mailer
        .send_reset_password_email(&email, &token)
        .await
    {
        tracing::error!(error = %err, "reset email not delivered");
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        );
    }

    StatusCode::NO_CONTENT.into_response()
}

/// POST /v1/auth/reset-password?token=… — redeem the token, set a new
/// password. 401 on any failure, with the cause kept server-side.
async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<TokenQuery>,
    Json(body): Json<ResetPasswordRequest>,
) -> axum::response::Response {
    let token = OpaqueToken::from_raw(query.token);

    match services
        .purpose
        .consume_for_password_reset(&token, &body.password)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::auth_error_response(err),
    }
}

/// POST /v1/auth/send-verification-email — authenticated re-request.
async fn send_verification_email(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let token = match services.purpose.issue_verify_token(ctx.user.id).await {
        Ok(token) => token,
        Err(err) => return errors::auth_error_response(err),
    };

    if let Err(err) = services
        .mailer
        .send_verification_email(&ctx.user.email, &token)
        .await
    {
        tracing::error!(error = %err, "verification email not delivered");
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        );
    }

    StatusCode::NO_CONTENT.into_response()
}

/// POST /v1/auth/verify-email?token=… — redeem the verification token.
async fn verify_email(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<TokenQuery>,
) -> axum::response::Response {
    let token = OpaqueToken::from_raw(query.token);

    match services.purpose.consume_for_email_verification(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::auth_error_response(err),
    }
}
