//! Session introspection: who is behind this access token.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use crate::auth::AuthGuard;

use super::{extract_bearer_token, guard_error_response, ErrorBody, UserBody};

#[utoipa::path(
    get,
    path = "/auth/session",
    responses (
        (status = 200, description = "Access token is valid, returns the authenticated user", body = UserBody),
        (status = 401, description = "Token missing, invalid, expired or blacklisted", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth",
)]
#[instrument(skip(guard, headers))]
pub async fn session(
    Extension(guard): Extension<Arc<AuthGuard>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                message: "Missing bearer token".to_string(),
                code: None,
            }),
        )
            .into_response();
    };

    match guard.authorize(&token).await {
        Ok(identity) => (StatusCode::OK, Json(UserBody::from(&identity))).into_response(),
        Err(err) => guard_error_response(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{test_protocol, VALID_EMAIL, VALID_PASSWORD};
    use crate::store::RevocationStore;
    use crate::token::TokenType;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use chrono::Utc;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }

    #[tokio::test]
    async fn valid_session_returns_the_user() {
        let (protocol, store) = test_protocol();
        let (tokens, identity) = protocol
            .login(VALID_EMAIL, VALID_PASSWORD)
            .await
            .expect("login");
        let guard = Arc::new(AuthGuard::new(protocol.codec().clone(), store));

        let response = session(Extension(guard), bearer(&tokens.access_token))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["email"], VALID_EMAIL);
        assert_eq!(body["id"], identity.id.to_string());
        assert_eq!(body["fullName"], identity.full_name);
    }

    #[tokio::test]
    async fn blacklisted_jti_is_unauthorized_with_code() {
        let (protocol, store) = test_protocol();
        let (tokens, _) = protocol
            .login(VALID_EMAIL, VALID_PASSWORD)
            .await
            .expect("login");
        let claims = protocol
            .codec()
            .verify(
                TokenType::Access,
                &tokens.access_token,
                Utc::now().timestamp(),
            )
            .expect("claims");

        store.blacklist(&claims.jti, 900).await.expect("store");
        let guard = Arc::new(AuthGuard::new(protocol.codec().clone(), store));

        let response = session(Extension(guard), bearer(&tokens.access_token))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["code"], "TOKEN_BLACKLISTED");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (protocol, store) = test_protocol();
        let guard = Arc::new(AuthGuard::new(protocol.codec().clone(), store));

        let response = session(Extension(guard), HeaderMap::new())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
