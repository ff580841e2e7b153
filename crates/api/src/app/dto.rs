use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_auth::{IssuedSession, User};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// `?token=…` query for the reset and verify endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub email_verified: bool,
}

impl From<&User> for UserBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            email_verified: user.email_verified,
        }
    }
}

/// The one place a raw session token crosses the wire.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&IssuedSession> for SessionBody {
    fn from(issued: &IssuedSession) -> Self {
        Self {
            token: issued.token.expose().to_string(),
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserBody,
    pub session: SessionBody,
}
