//! Per-request access-token gate.
//!
//! Signature verification alone cannot see a logout, so every request also
//! consults the blacklist. When the store cannot answer, the guard fails
//! closed: no blacklist answer means no access. The opt-in fail-open mode
//! exists for the boot window where the store is not reachable yet; it skips
//! only the blacklist check, never signature verification.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::store::RevocationStore;
use crate::token::{TokenCodec, TokenType};

use super::{identity_from_claims, AuthError, UserIdentity};

#[derive(Clone)]
pub struct AuthGuard {
    codec: TokenCodec,
    store: Arc<dyn RevocationStore>,
    fail_open: bool,
}

impl AuthGuard {
    #[must_use]
    pub fn new(codec: TokenCodec, store: Arc<dyn RevocationStore>) -> Self {
        Self {
            codec,
            store,
            fail_open: false,
        }
    }

    /// Skip the blacklist check when the store is unavailable. Documented
    /// escape hatch; keep it off unless boot ordering requires it.
    #[must_use]
    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Verify an access token and check it against the blacklist.
    ///
    /// # Errors
    ///
    /// Verification failures for a bad token, `TokenBlacklisted` for a
    /// revoked one, `StoreUnavailable` when the blacklist cannot be
    /// consulted (and fail-open is off).
    pub async fn authorize(&self, access_token: &str) -> Result<UserIdentity, AuthError> {
        let now = Utc::now().timestamp();
        let claims = match self.codec.verify(TokenType::Access, access_token, now) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(target: "security", "Access token failed verification: {err}");
                return Err(err.into());
            }
        };

        match self.store.is_blacklisted(&claims.jti).await {
            Ok(true) => {
                warn!(
                    target: "security",
                    "Blacklisted token presented (jti: {}, email: {})",
                    claims.jti,
                    super::mask_email(&claims.email)
                );
                Err(AuthError::TokenBlacklisted)
            }
            Ok(false) => identity_from_claims(&claims),
            Err(err) if self.fail_open => {
                warn!("Blacklist check skipped, store unavailable (fail-open): {err}");
                identity_from_claims(&claims)
            }
            Err(err) => {
                warn!("Blacklist check failed, denying request: {err}");
                Err(err.into())
            }
        }
    }
}
