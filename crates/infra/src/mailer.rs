//! Outbound mail port.
//!
//! Actual delivery (SMTP, a provider API) is deployment-specific; the
//! default implementation here writes the message to the log, which is what
//! local development runs on.

use async_trait::async_trait;

use gatehouse_auth::OpaqueToken;

/// Mail delivery failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailerError(pub String);

/// Outbound mail contract used by the HTTP layer after issuing purpose
/// tokens. The token travels inside the mail body; it is the delivery
/// channel for the credential, not a log statement.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_password_email(
        &self,
        to: &str,
        token: &OpaqueToken,
    ) -> Result<(), MailerError>;

    async fn send_verification_email(
        &self,
        to: &str,
        token: &OpaqueToken,
    ) -> Result<(), MailerError>;
}

/// Dev-mode mailer: emits the mail content as a log line instead of
/// sending it anywhere.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

impl TracingMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_reset_password_email(
        &self,
        to: &str,
        token: &OpaqueToken,
    ) -> Result<(), MailerError> {
        tracing::info!(
            recipient = %to,
            link = %format!("/v1/auth/reset-password?token={}", token.expose()),
            "dev mailer: password reset email"
        );
        Ok(())
    }

    async fn send_verification_email(
        &self,
        to: &str,
        token: &OpaqueToken,
    ) -> Result<(), MailerError> {
        tracing::info!(
            recipient = %to,
            link = %format!("/v1/auth/verify-email?token={}", token.expose()),
            "dev mailer: verification email"
        );
        Ok(())
    }
}
