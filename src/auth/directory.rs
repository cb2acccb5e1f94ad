//! User directory collaborator: lookup by email + password verification.
//!
//! The auth subsystem does not own user records; it asks the directory once,
//! at login. The trait keeps the protocol testable without a database.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Read-only snapshot of a directory user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No account for the email. The original backend exposed this case
    /// separately from a bad password, so the split is kept.
    #[error("email not registered")]
    UnknownEmail,
    #[error("wrong password")]
    WrongPassword,
    #[error("user directory error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Verify `password` for the account registered under `email`.
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<UserIdentity, DirectoryError>;
}

/// PostgreSQL-backed directory verifying Argon2 password hashes.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, DirectoryError> {
        let row: Option<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT id, email, full_name, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            error!("Failed to look up user: {err}");
            DirectoryError::Backend(err.to_string())
        })?;

        let Some((id, email, full_name, password_hash)) = row else {
            return Err(DirectoryError::UnknownEmail);
        };

        let parsed = PasswordHash::new(&password_hash).map_err(|err| {
            error!("Stored password hash is invalid for user {id}: {err}");
            DirectoryError::Backend("invalid stored password hash".to_string())
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| DirectoryError::WrongPassword)?;

        Ok(UserIdentity {
            id,
            email,
            full_name,
        })
    }
}
