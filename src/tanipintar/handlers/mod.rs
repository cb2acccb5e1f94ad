pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod logout;
pub use self::logout::logout;

pub mod refresh;
pub use self::refresh::refresh;

pub mod session;
pub use self::session::session;

// common helpers for the handlers
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use chrono::SecondsFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthError, IssuedTokens, UserIdentity};

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Pull the token out of an `Authorization: Bearer ...` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            code: None,
        }
    }

    fn with_code(message: &str, code: &str) -> Self {
        Self {
            message: message.to_string(),
            code: Some(code.to_string()),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl From<&UserIdentity> for UserBody {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            id: identity.id.to_string(),
            full_name: identity.full_name.clone(),
            email: identity.email.clone(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairBody {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub access_token_expires: String,
    pub refresh_token_expires: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserBody>,
}

impl TokenPairBody {
    pub(crate) fn new(message: &str, tokens: IssuedTokens, user: Option<&UserIdentity>) -> Self {
        Self {
            message: message.to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
            access_token_expires: tokens
                .access_expires_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            refresh_token_expires: tokens
                .refresh_expires_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            user: user.map(UserBody::from),
        }
    }
}

/// Map an auth failure to its HTTP shape.
///
/// All token-verification sub-reasons share one 401 body; the distinction
/// only exists in the server-side logs.
pub(crate) fn auth_error_response(err: &AuthError) -> (StatusCode, Json<ErrorBody>) {
    let (status, body) = match err {
        AuthError::UnknownEmail => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("Email not registered"),
        ),
        AuthError::WrongPassword => (StatusCode::UNAUTHORIZED, ErrorBody::new("Wrong password")),
        AuthError::TokenExpired | AuthError::TokenMalformed(_) | AuthError::WrongTokenType => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("Token is invalid or expired"),
        ),
        AuthError::AlreadyExpired => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("Token already expired"),
        ),
        AuthError::TokenBlacklisted => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::with_code("Token is no longer valid", "TOKEN_BLACKLISTED"),
        ),
        AuthError::SessionNotFound => (
            StatusCode::FORBIDDEN,
            ErrorBody::new("Refresh token is no longer valid (already used or expired)"),
        ),
        AuthError::ReuseDetected | AuthError::Conflict => (
            StatusCode::FORBIDDEN,
            ErrorBody::new("Refresh token is invalid (possible reuse)"),
        ),
        AuthError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody::new("Authentication service temporarily unavailable"),
        ),
        AuthError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal server error"),
        ),
    };
    (status, Json(body))
}

/// Error mapping for the request guard: a store outage fails closed, so the
/// caller sees the same generic 401 as any other unauthenticated request.
pub(crate) fn guard_error_response(err: &AuthError) -> (StatusCode, Json<ErrorBody>) {
    if matches!(err, AuthError::StoreUnavailable(_)) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Token is invalid or expired")),
        );
    }
    auth_error_response(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use crate::token;

    #[test]
    fn email_validation() {
        assert!(valid_email("petani@sawah.id"));
        assert!(valid_email("a@b.com"));
        assert!(!valid_email("petani@sawah"));
        assert!(!valid_email("petani"));
        assert!(!valid_email("pe tani@sawah.id"));
        assert!(!valid_email(""));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_bearer_token(&headers), Some("xyz".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn verification_failures_share_one_response() {
        let expired = auth_error_response(&AuthError::TokenExpired);
        let malformed = auth_error_response(&AuthError::TokenMalformed(token::Error::Base64));
        let wrong_type = auth_error_response(&AuthError::WrongTokenType);

        assert_eq!(expired.0, StatusCode::UNAUTHORIZED);
        assert_eq!(malformed.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_type.0, StatusCode::UNAUTHORIZED);
        // Same message: the response must not reveal which check failed.
        assert_eq!(expired.1.message, malformed.1.message);
        assert_eq!(expired.1.message, wrong_type.1.message);
    }

    #[test]
    fn replay_failures_are_forbidden() {
        for err in [
            AuthError::SessionNotFound,
            AuthError::ReuseDetected,
            AuthError::Conflict,
        ] {
            let (status, _) = auth_error_response(&err);
            assert_eq!(status, StatusCode::FORBIDDEN, "{err} must map to 403");
        }
    }

    #[test]
    fn blacklisted_carries_its_code() {
        let (status, body) = auth_error_response(&AuthError::TokenBlacklisted);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code.as_deref(), Some("TOKEN_BLACKLISTED"));
    }

    #[test]
    fn guard_fails_closed_on_store_outage() {
        let (status, body) =
            guard_error_response(&AuthError::StoreUnavailable("down".to_string()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.code.is_none());

        // Outside the guard the same failure is a 503.
        let (status, _) = auth_error_response(&AuthError::StoreUnavailable("down".to_string()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
