//! Revocation store: shared session and blacklist state.
//!
//! Every running server process consults the same store, so session tracking
//! must never live in process memory. The trait is the injection seam; the
//! Redis implementation is the production backend and the memory
//! implementation backs tests and single-process development.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Session records live under `refresh_{jti}`, blacklist marks under
/// `bl_{jti}`. Both carry a TTL equal to the lifetime left on the token they
/// track, so the store cleans up after itself.
pub const SESSION_KEY_PREFIX: &str = "refresh_";
pub const BLACKLIST_KEY_PREFIX: &str = "bl_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
    #[error("revocation store error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_value` as the one valid refresh token for `jti`.
    async fn put_session(
        &self,
        jti: &str,
        token_value: &str,
        ttl_seconds: i64,
    ) -> Result<(), StoreError>;

    /// The refresh token currently valid for `jti`, if the session is live.
    async fn get_session(&self, jti: &str) -> Result<Option<String>, StoreError>;

    /// Drop the session for `jti`. Idempotent.
    async fn delete_session(&self, jti: &str) -> Result<(), StoreError>;

    /// Atomically replace the session for `old_jti` with one for `new_jti`.
    ///
    /// The swap only happens if the stored value still equals `expected`;
    /// otherwise nothing is modified and `false` is returned. Exactly one of
    /// any number of concurrent callers can win. There is no intermediate
    /// state where both or neither session is observable mid-swap.
    async fn rotate_session(
        &self,
        old_jti: &str,
        expected: &str,
        new_jti: &str,
        new_value: &str,
        ttl_seconds: i64,
    ) -> Result<bool, StoreError>;

    /// Mark `jti` revoked until its natural expiry.
    async fn blacklist(&self, jti: &str, ttl_seconds: i64) -> Result<(), StoreError>;

    /// Whether `jti` has been revoked.
    async fn is_blacklisted(&self, jti: &str) -> Result<bool, StoreError>;
}

pub(crate) fn session_key(jti: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{jti}")
}

pub(crate) fn blacklist_key(jti: &str) -> String {
    format!("{BLACKLIST_KEY_PREFIX}{jti}")
}
