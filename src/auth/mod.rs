//! Login, logout and refresh-token rotation.
//!
//! A session is born at login under a fresh `jti`, carried by an
//! access/refresh token pair sharing that `jti`. Refresh exchanges the pair
//! for a new one under a new `jti` in a single store transition, so a
//! refresh token can be spent exactly once; presenting a superseded one is
//! treated as a replay. Logout blacklists the `jti` and drops the session,
//! killing both halves of the pair together.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::RevocationStore;
use crate::token::{TokenClaims, TokenCodec, TokenType};

pub mod directory;
pub mod error;
pub mod guard;

pub use directory::{DirectoryError, PgUserDirectory, UserDirectory, UserIdentity};
pub use error::AuthError;
pub use guard::AuthGuard;

/// Mask an email for logs: `m***a@domain`. Never log addresses raw.
#[must_use]
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((name, domain)) if !name.is_empty() => {
            let first = name.chars().next().map(String::from).unwrap_or_default();
            let last = name.chars().last().map(String::from).unwrap_or_default();
            format!("{first}***{last}@{domain}")
        }
        _ => "***".to_string(),
    }
}

/// A freshly minted access/refresh pair and its expiry metadata.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// The session state machine: login, logout, refresh rotation.
#[derive(Clone)]
pub struct RotationProtocol {
    codec: TokenCodec,
    store: Arc<dyn RevocationStore>,
    directory: Arc<dyn UserDirectory>,
}

impl RotationProtocol {
    #[must_use]
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn RevocationStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            codec,
            store,
            directory,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate credentials and open a new session.
    ///
    /// # Errors
    ///
    /// `UnknownEmail`/`WrongPassword` from the directory, or store errors
    /// when the session record cannot be written.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IssuedTokens, UserIdentity), AuthError> {
        let identity = match self.directory.authenticate(email, password).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(target: "security", "Login failed for {}: {err}", mask_email(email));
                return Err(err.into());
            }
        };

        let jti = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();
        let tokens = self.mint_pair(&identity, &jti, now)?;

        self.store
            .put_session(
                &jti,
                &tokens.refresh_token,
                self.codec.ttl_seconds(TokenType::Refresh),
            )
            .await?;

        info!(target: "auth", "Login succeeded for {} (jti: {jti})", mask_email(email));
        Ok((tokens, identity))
    }

    /// Close the session behind an access token.
    ///
    /// Blacklists the token's `jti` for its remaining lifetime and deletes
    /// the session record sharing that `jti`, so the paired refresh token
    /// dies with it.
    ///
    /// # Errors
    ///
    /// Verification failures for an invalid token, `AlreadyExpired` for a
    /// token that needs no revocation, or store errors.
    pub async fn logout(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        let now = Utc::now().timestamp();
        let claims = match self.codec.verify(TokenType::Access, access_token, now) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(target: "security", "Logout with invalid access token: {err}");
                return Err(err.into());
            }
        };

        // The verifier already rejects expired tokens; this only fires if
        // the clock moved between the two reads.
        if claims.exp <= now {
            debug!("Logout for already expired token (jti: {})", claims.jti);
            return Err(AuthError::AlreadyExpired);
        }

        self.store
            .blacklist(&claims.jti, claims.remaining_seconds(now))
            .await?;
        self.store.delete_session(&claims.jti).await?;

        info!(
            target: "auth",
            "Logout for {} (jti: {})",
            mask_email(&claims.email),
            claims.jti
        );
        Ok(claims)
    }

    /// Exchange a refresh token for a new pair, rotating the session.
    ///
    /// # Errors
    ///
    /// Verification failures for an invalid token; `SessionNotFound` when no
    /// live session exists (rotated away, revoked or expired — deliberately
    /// indistinguishable); `ReuseDetected` when the session holds a
    /// different value than presented; `Conflict` when a concurrent caller
    /// won the rotation.
    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<(IssuedTokens, UserIdentity), AuthError> {
        let now = Utc::now().timestamp();
        let claims = match self.codec.verify(TokenType::Refresh, refresh_token, now) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(target: "security", "Refresh token failed verification: {err}");
                return Err(err.into());
            }
        };
        let old_jti = claims.jti.clone();

        let Some(stored) = self.store.get_session(&old_jti).await? else {
            warn!(
                target: "security",
                "Refresh with no live session (jti: {old_jti}, email: {})",
                mask_email(&claims.email)
            );
            return Err(AuthError::SessionNotFound);
        };

        if stored != refresh_token {
            // Same jti, different value: a superseded token is being replayed.
            if let Err(err) = self
                .store
                .blacklist(&old_jti, claims.remaining_seconds(now))
                .await
            {
                warn!("Failed to blacklist replayed jti {old_jti}: {err}");
            }
            warn!(
                target: "security",
                "Refresh token reuse detected (jti: {old_jti}, email: {})",
                mask_email(&claims.email)
            );
            return Err(AuthError::ReuseDetected);
        }

        let identity = identity_from_claims(&claims)?;
        let new_jti = Uuid::new_v4().to_string();
        let tokens = self.mint_pair(&identity, &new_jti, now)?;

        let rotated = self
            .store
            .rotate_session(
                &old_jti,
                refresh_token,
                &new_jti,
                &tokens.refresh_token,
                self.codec.ttl_seconds(TokenType::Refresh),
            )
            .await?;
        if !rotated {
            // Someone else swapped the session between our read and the CAS.
            // Never fall back to re-issuing under the old jti.
            warn!(
                target: "security",
                "Lost refresh rotation race (jti: {old_jti}, email: {})",
                mask_email(&claims.email)
            );
            return Err(AuthError::Conflict);
        }

        // The old access token shares the old jti; kill it too.
        if let Err(err) = self
            .store
            .blacklist(&old_jti, claims.remaining_seconds(now))
            .await
        {
            warn!("Failed to blacklist rotated jti {old_jti}: {err}");
        }

        info!(
            target: "auth",
            "Refresh succeeded for {} (jti: {old_jti} -> {new_jti})",
            mask_email(&claims.email)
        );
        Ok((tokens, identity))
    }

    fn mint_pair(
        &self,
        identity: &UserIdentity,
        jti: &str,
        now: i64,
    ) -> Result<IssuedTokens, AuthError> {
        let user_id = identity.id.to_string();
        let access_token = self
            .codec
            .issue(
                TokenType::Access,
                &user_id,
                &identity.email,
                &identity.full_name,
                jti,
                now,
            )
            .map_err(|err| AuthError::Internal(err.to_string()))?;
        let refresh_token = self
            .codec
            .issue(
                TokenType::Refresh,
                &user_id,
                &identity.email,
                &identity.full_name,
                jti,
                now,
            )
            .map_err(|err| AuthError::Internal(err.to_string()))?;

        let expires_in = self.codec.ttl_seconds(TokenType::Access);
        let access_expires_at = datetime_from_unix(now + expires_in)?;
        let refresh_expires_at =
            datetime_from_unix(now + self.codec.ttl_seconds(TokenType::Refresh))?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in,
            access_expires_at,
            refresh_expires_at,
        })
    }
}

fn identity_from_claims(claims: &TokenClaims) -> Result<UserIdentity, AuthError> {
    let id = Uuid::parse_str(&claims.user_id)
        .map_err(|err| AuthError::Internal(format!("invalid userId claim: {err}")))?;
    Ok(UserIdentity {
        id,
        email: claims.email.clone(),
        full_name: claims.name.clone(),
    })
}

fn datetime_from_unix(unix_seconds: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(unix_seconds, 0)
        .ok_or_else(|| AuthError::Internal(format!("timestamp out of range: {unix_seconds}")))
}
