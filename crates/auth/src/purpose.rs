//! Purpose-scoped tokens: password reset and email verification.
//!
//! These are short-lived, single-use cousins of session tokens. Consumption
//! deletes every outstanding token of that purpose for the user, so a token
//! can never be replayed; issuing a new one supersedes (removes) the old.
//!
//! The two consume flows deliberately collapse every internal failure into
//! one opaque outward signal. A caller probing a reset endpoint learns only
//! "it failed", never which step failed; the cause goes to the log.

use std::sync::Arc;

use chrono::{Duration, Utc};

use gatehouse_core::{AuthError, AuthResult, UserId};

use crate::store::{TokenPurpose, TokenRecord, TokenStore};
use crate::token::{OpaqueToken, TokenId};
use crate::users::{PasswordHasher, UserDirectory};

/// Lifetime of reset and verification tokens.
pub const PURPOSE_TOKEN_TTL_MINUTES: i64 = 10;

/// Orchestrates issuance and one-time consumption of purpose tokens.
#[derive(Clone)]
pub struct PurposeTokenManager {
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserDirectory>,
    passwords: Arc<dyn PasswordHasher>,
}

impl PurposeTokenManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        users: Arc<dyn UserDirectory>,
        passwords: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            users,
            passwords,
        }
    }

    /// Issue a password-reset token for the user owning `email`.
    ///
    /// Fails with [`AuthError::NotFound`] when no user has that email.
    /// Delivery of the token (the reset email) is the caller's job.
    pub async fn issue_reset_token(&self, email: &str) -> AuthResult<OpaqueToken> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        self.issue(user.id, TokenPurpose::ResetPassword).await
    }

    /// Issue an email-verification token for `user_id`.
    pub async fn issue_verify_token(&self, user_id: UserId) -> AuthResult<OpaqueToken> {
        self.issue(user_id, TokenPurpose::VerifyEmail).await
    }

    async fn issue(&self, user_id: UserId, purpose: TokenPurpose) -> AuthResult<OpaqueToken> {
        // A new request supersedes anything still outstanding.
        self.store.delete_all_for_user(user_id, purpose).await?;

        let token = OpaqueToken::generate();
        let expires_at = Utc::now() + Duration::minutes(PURPOSE_TOKEN_TTL_MINUTES);

        self.store
            .put(TokenRecord {
                id: TokenId::derive(&token),
                user_id,
                purpose,
                expires_at,
                blacklisted: false,
            })
            .await?;

        tracing::debug!(%user_id, %purpose, %expires_at, "purpose token issued");

        Ok(token)
    }

    /// Look up a purpose token by its raw value.
    ///
    /// Filters on purpose and blacklist flag; a blacklisted token is
    /// invisible to a non-blacklisted lookup. Expired tokens are deleted
    /// and reported as [`AuthError::NotFound`].
    pub async fn verify(
        &self,
        token: &OpaqueToken,
        purpose: TokenPurpose,
        blacklisted: bool,
    ) -> AuthResult<TokenRecord> {
        let id = TokenId::derive(token);

        let record = self
            .store
            .find_by_purpose(&id, purpose, blacklisted)
            .await?
            .ok_or(AuthError::NotFound)?;

        if Utc::now() >= record.expires_at {
            self.store.delete(&id).await?;
            return Err(AuthError::NotFound);
        }

        Ok(record)
    }

    /// Redeem a reset token and set a new password.
    ///
    /// Any failure along the way (bad token, vanished user, store error)
    /// is logged and re-signaled uniformly as
    /// [`AuthError::PasswordResetFailed`].
    pub async fn consume_for_password_reset(
        &self,
        token: &OpaqueToken,
        new_password: &str,
    ) -> AuthResult<()> {
        self.reset_password(token, new_password)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "password reset failed");
                AuthError::PasswordResetFailed
            })
    }

    async fn reset_password(&self, token: &OpaqueToken, new_password: &str) -> AuthResult<()> {
        let record = self
            .verify(token, TokenPurpose::ResetPassword, false)
            .await?;

        let user = self
            .users
            .get_by_id(record.user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let password_hash = self.passwords.hash(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;

        // Single-use: nothing of this purpose survives a successful reset.
        self.store
            .delete_all_for_user(user.id, TokenPurpose::ResetPassword)
            .await?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Redeem a verification token and mark the user's email verified.
    ///
    /// Failures are logged and re-signaled uniformly as
    /// [`AuthError::EmailVerificationFailed`].
    pub async fn consume_for_email_verification(&self, token: &OpaqueToken) -> AuthResult<()> {
        self.verify_email(token).await.map_err(|err| {
            tracing::warn!(error = %err, "email verification failed");
            AuthError::EmailVerificationFailed
        })
    }

    async fn verify_email(&self, token: &OpaqueToken) -> AuthResult<()> {
        let record = self.verify(token, TokenPurpose::VerifyEmail, false).await?;

        self.store
            .delete_all_for_user(record.user_id, TokenPurpose::VerifyEmail)
            .await?;
        self.users.mark_email_verified(record.user_id).await?;

        tracing::info!(user_id = %record.user_id, "email verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;

    use crate::rights::Role;
    use crate::store::InMemoryTokenStore;
    use crate::users::{InMemoryUserDirectory, PasswordHashError, User};

    /// Reversible stand-in for the real hasher; good enough to observe
    /// that the stored hash changed.
    struct StubHasher;

    impl PasswordHasher for StubHasher {
        fn hash(&self, plain: &str) -> Result<String, PasswordHashError> {
            Ok(format!("hashed:{plain}"))
        }

        fn verify(&self, plain: &str, hash: &str) -> bool {
            hash == format!("hashed:{plain}")
        }
    }

    struct Fixture {
        store: Arc<InMemoryTokenStore>,
        users: Arc<InMemoryUserDirectory>,
        manager: PurposeTokenManager,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryTokenStore::new());
            let users = Arc::new(InMemoryUserDirectory::new());
            let manager =
                PurposeTokenManager::new(store.clone(), users.clone(), Arc::new(StubHasher));
            Self {
                store,
                users,
                manager,
            }
        }

        async fn add_user(&self, email: &str) -> UserId {
            let id = UserId::new();
            self.users
                .create(User {
                    id,
                    email: email.to_string(),
                    name: "Test User".to_string(),
                    role: Role::new("user"),
                    password_hash: "hashed:original".to_string(),
                    email_verified: false,
                })
                .await
                .unwrap();
            id
        }

        async fn plant_token(
            &self,
            user_id: UserId,
            purpose: TokenPurpose,
            expires_at: DateTime<Utc>,
            blacklisted: bool,
        ) -> OpaqueToken {
            let token = OpaqueToken::generate();
            self.store
                .put(TokenRecord {
                    id: TokenId::derive(&token),
                    user_id,
                    purpose,
                    expires_at,
                    blacklisted,
                })
                .await
                .unwrap();
            token
        }
    }

    #[tokio::test]
    async fn reset_token_for_unknown_email_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .manager
            .issue_reset_token("nobody@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);
    }

    #[tokio::test]
    async fn issued_reset_token_verifies() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;

        let token = fx
            .manager
            .issue_reset_token("alice@example.com")
            .await
            .unwrap();

        let record = fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, false)
            .await
            .unwrap();
        assert_eq!(record.user_id, user_id);
    }

    #[tokio::test]
    async fn reissuing_supersedes_the_outstanding_token() {
        let fx = Fixture::new();
        fx.add_user("alice@example.com").await;

        let first = fx
            .manager
            .issue_reset_token("alice@example.com")
            .await
            .unwrap();
        let _second = fx
            .manager
            .issue_reset_token("alice@example.com")
            .await
            .unwrap();

        let err = fx
            .manager
            .verify(&first, TokenPurpose::ResetPassword, false)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);
    }

    #[tokio::test]
    async fn expired_purpose_token_is_deleted_on_verify() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;
        let token = fx
            .plant_token(
                user_id,
                TokenPurpose::ResetPassword,
                Utc::now() - Duration::minutes(1),
                false,
            )
            .await;

        let err = fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, false)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);

        // Removed, not merely rejected.
        let id = TokenId::derive(&token);
        assert!(fx.store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blacklisted_token_is_invisible_to_clean_lookups() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;
        let token = fx
            .plant_token(
                user_id,
                TokenPurpose::ResetPassword,
                Utc::now() + Duration::minutes(10),
                true,
            )
            .await;

        let err = fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, false)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);

        // Visible when asked for blacklisted tokens explicitly.
        assert!(fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, true)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn password_reset_updates_the_hash_and_burns_the_token() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;

        let token = fx
            .manager
            .issue_reset_token("alice@example.com")
            .await
            .unwrap();

        fx.manager
            .consume_for_password_reset(&token, "new-password")
            .await
            .unwrap();

        let user = fx.users.get_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hashed:new-password");

        // Single use: the same raw token no longer verifies.
        let err = fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, false)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);
    }

    #[tokio::test]
    async fn failed_reset_collapses_to_one_signal() {
        let fx = Fixture::new();
        let err = fx
            .manager
            .consume_for_password_reset(&OpaqueToken::generate(), "whatever")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::PasswordResetFailed);
    }

    #[tokio::test]
    async fn email_verification_marks_the_user_and_burns_the_token() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;

        let token = fx.manager.issue_verify_token(user_id).await.unwrap();
        fx.manager
            .consume_for_email_verification(&token)
            .await
            .unwrap();

        let user = fx.users.get_by_id(user_id).await.unwrap().unwrap();
        assert!(user.email_verified);

        let err = fx
            .manager
            .consume_for_email_verification(&token)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailVerificationFailed);
    }

    #[tokio::test]
    async fn session_tokens_never_pass_purpose_verification() {
        let fx = Fixture::new();
        let user_id = fx.add_user("alice@example.com").await;
        let token = fx
            .plant_token(
                user_id,
                TokenPurpose::Session,
                Utc::now() + Duration::days(30),
                false,
            )
            .await;

        let err = fx
            .manager
            .verify(&token, TokenPurpose::ResetPassword, false)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound);
    }
}
