//! User lookup, guarded by the role-rights evaluator.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use gatehouse_auth::{authorize, Permission};
use gatehouse_core::UserId;

use crate::app::dto::UserBody;
use crate::app::{errors, AppServices};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new().route("/v1/users/:id", get(get_user))
}

/// GET /v1/users/:id — requires `users.read`, or the caller asking about
/// their own account.
async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(subject) = UserId::from_str(&id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "malformed user id");
    };

    let required = [Permission::new("users.read")];
    if let Err(err) = authorize(&services.rights, &ctx.user, &required, Some(subject)) {
        return errors::auth_error_response(err);
    }

    match services.users.get_by_id(subject).await {
        Ok(Some(user)) => (StatusCode::OK, Json(UserBody::from(&user))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        Err(err) => errors::auth_error_response(err.into()),
    }
}
