use thiserror::Error;

use crate::store::StoreError;
use crate::token;

use super::directory::DirectoryError;

/// Failure taxonomy of the auth subsystem.
///
/// Token-verification variants are kept distinct for server-side logging but
/// must collapse to one generic response at the HTTP boundary so callers
/// cannot probe which check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email not registered")]
    UnknownEmail,
    #[error("wrong password")]
    WrongPassword,
    #[error("token expired")]
    TokenExpired,
    #[error("token malformed or signature invalid: {0}")]
    TokenMalformed(token::Error),
    #[error("wrong token type")]
    WrongTokenType,
    #[error("token already expired")]
    AlreadyExpired,
    #[error("token revoked")]
    TokenBlacklisted,
    #[error("no live session for this token")]
    SessionNotFound,
    #[error("refresh token reuse detected")]
    ReuseDetected,
    #[error("lost the session rotation race")]
    Conflict,
    #[error("revocation store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl From<token::Error> for AuthError {
    fn from(err: token::Error) -> Self {
        match err {
            token::Error::Expired => Self::TokenExpired,
            token::Error::WrongTokenType => Self::WrongTokenType,
            other => Self::TokenMalformed(other),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            StoreError::Backend(reason) => Self::Internal(reason),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UnknownEmail => Self::UnknownEmail,
            DirectoryError::WrongPassword => Self::WrongPassword,
            DirectoryError::Backend(reason) => Self::Internal(reason),
        }
    }
}

impl AuthError {
    /// Whether this failure is one of the token-verification sub-reasons
    /// that must be indistinguishable to the client.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenMalformed(_) | Self::WrongTokenType
        )
    }

    /// Whether this failure should produce a security-audit log entry.
    #[must_use]
    pub const fn is_security_event(&self) -> bool {
        matches!(self, Self::ReuseDetected | Self::Conflict)
    }
}
