use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use gatehouse_auth::{OpaqueToken, SessionManager};

use crate::app::errors;
use crate::context::{AuthContext, BearerToken};

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionManager,
}

/// Authenticate the request from its bearer token.
///
/// Missing header, malformed header, unknown token, and expired token all
/// produce the same 401 response; nothing about the failing check leaks to
/// the client. Store failures become 500s.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(raw) = extract_bearer(req.headers()) else {
        return Err(errors::authentication_failed());
    };
    let token = OpaqueToken::from_raw(raw);

    let auth = state
        .sessions
        .validate(&token)
        .await
        .map_err(errors::auth_error_response)?
        .ok_or_else(errors::authentication_failed)?;

    req.extensions_mut().insert(AuthContext::from(auth));
    req.extensions_mut().insert(BearerToken(token));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::header::AUTHORIZATION;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_is_extracted() {
        let headers = headers_with("Bearer abc123");
        assert_eq!(extract_bearer(&headers), Some("abc123"));
    }

    #[test]
    fn missing_scheme_is_rejected() {
        let headers = headers_with("abc123");
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn empty_token_is_rejected() {
        let headers = headers_with("Bearer   ");
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn absent_header_is_rejected() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
