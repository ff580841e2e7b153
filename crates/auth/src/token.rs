//! Opaque bearer tokens and their storage identifiers.
//!
//! The raw token is the bearer credential; only its SHA-256 digest is ever
//! persisted. A read of the store (or a database leak) therefore never
//! discloses usable credentials. This is the crate's core security property.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of the random secret, in bytes, before encoding.
pub const TOKEN_BYTES: usize = 20;

/// A raw bearer secret with no embedded structure or claims.
///
/// Validity is determined solely by the presence of its digest in the token
/// store. The raw value exists only in the response payload and the client's
/// memory; it must never be logged or persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct OpaqueToken(String);

impl OpaqueToken {
    /// Generate a fresh token from the OS CSPRNG, encoded as lowercase hex
    /// (URL-safe, 40 characters).
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token received from a client (Authorization header, query
    /// parameter). No structural validation beyond presence is performed.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw secret. Callers hand this to the client and nowhere else.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of debug output and log lines.
impl core::fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("OpaqueToken(..)")
    }
}

/// Storage identifier of a token: lowercase-hex SHA-256 of the raw token's
/// UTF-8 bytes. Safe to store, log, and index on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenId(String);

impl TokenId {
    /// Derive the storage id for a token. Deterministic and pure: the same
    /// token always yields the same id.
    pub fn derive(token: &OpaqueToken) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.expose().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Rehydrate an id previously produced by [`TokenId::derive`] (e.g. a
    /// database row's primary key).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TokenId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn generated_tokens_are_lowercase_hex() {
        let token = OpaqueToken::generate();
        assert_eq!(token.expose().len(), TOKEN_BYTES * 2);
        assert!(token
            .expose()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_is_stable_for_identical_input() {
        let token = OpaqueToken::from_raw("some-bearer-secret");
        assert_eq!(TokenId::derive(&token), TokenId::derive(&token));
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        // Known vector: sha256("abc")
        let token = OpaqueToken::from_raw("abc");
        assert_eq!(
            TokenId::derive(&token).as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn fresh_tokens_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            let id = TokenId::derive(&OpaqueToken::generate());
            assert!(seen.insert(id), "duplicate digest from random tokens");
        }
    }

    #[test]
    fn debug_never_prints_the_secret() {
        let token = OpaqueToken::from_raw("super-secret-value");
        assert!(!format!("{token:?}").contains("super-secret-value"));
    }

    proptest! {
        #[test]
        fn distinct_tokens_yield_distinct_ids(a in "[a-f0-9]{40}", b in "[a-f0-9]{40}") {
            prop_assume!(a != b);
            let ta = OpaqueToken::from_raw(a);
            let tb = OpaqueToken::from_raw(b);
            prop_assert_ne!(TokenId::derive(&ta), TokenId::derive(&tb));
        }

        #[test]
        fn derive_is_deterministic(raw in ".{0,64}") {
            let token = OpaqueToken::from_raw(raw);
            prop_assert_eq!(TokenId::derive(&token), TokenId::derive(&token));
        }
    }
}
