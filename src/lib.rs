//! # TaniPintar Auth Service
//!
//! Authentication and session subsystem of the TaniPintar farm-monitoring
//! backend. The service issues short-lived access tokens paired with
//! long-lived, single-use refresh tokens and keeps session/revocation state
//! in a shared store (Redis/Valkey) so every server process sees the same
//! truth.
//!
//! ## Session lifecycle
//!
//! A login mints an access/refresh pair under one `jti` and records the
//! refresh token in the store. Refreshing rotates the session to a new `jti`
//! in a single atomic store transition, so each refresh token can be spent
//! exactly once; replaying a superseded token is detected and revokes the
//! session defensively. Logout blacklists the `jti` until the tokens would
//! have expired naturally, killing the pair together.
//!
//! ## Crate layout
//!
//! - [`token`] — compact HS256 token issuer/verifier with split secrets.
//! - [`store`] — revocation store trait plus Redis and in-memory backends.
//! - [`auth`] — the rotation protocol, user-directory seam and request guard.
//! - [`tanipintar`] — HTTP surface (axum) and OpenAPI document.
//! - [`cli`] — argument parsing, configuration and telemetry bootstrap.

pub mod auth;
pub mod cli;
pub mod store;
pub mod tanipintar;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
