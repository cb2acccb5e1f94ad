use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth::RotationProtocol;

use super::{auth_error_response, extract_bearer_token, ErrorBody};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses (
        (status = 200, description = "Session closed, token pair revoked", body = LogoutResponse),
        (status = 400, description = "Missing bearer token or token already expired", body = ErrorBody),
        (status = 401, description = "Invalid access token", body = ErrorBody),
        (status = 503, description = "Revocation store unavailable", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth",
)]
#[instrument(skip(protocol, headers))]
pub async fn logout(
    Extension(protocol): Extension<Arc<RotationProtocol>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                message: "Missing bearer token".to_string(),
                code: None,
            }),
        )
            .into_response();
    };

    match protocol.logout(&token).await {
        Ok(_claims) => (
            StatusCode::OK,
            Json(LogoutResponse {
                message: "Logout successful".to_string(),
            }),
        )
            .into_response(),
        Err(err) => auth_error_response(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{test_protocol, VALID_EMAIL, VALID_PASSWORD};
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }

    #[tokio::test]
    async fn logout_closes_the_session() {
        let (protocol, _store) = test_protocol();
        let (tokens, _) = protocol
            .login(VALID_EMAIL, VALID_PASSWORD)
            .await
            .expect("login");

        let response = logout(
            Extension(Arc::new(protocol.clone())),
            bearer(&tokens.access_token),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        // Both halves are dead now.
        let refresh = protocol.refresh(&tokens.refresh_token).await;
        assert!(refresh.is_err());
    }

    #[tokio::test]
    async fn missing_header_is_bad_request() {
        let (protocol, _store) = test_protocol();
        let response = logout(Extension(Arc::new(protocol)), HeaderMap::new())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let (protocol, _store) = test_protocol();
        let response = logout(Extension(Arc::new(protocol)), bearer("garbage"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_cannot_log_out() {
        let (protocol, _store) = test_protocol();
        let (tokens, _) = protocol
            .login(VALID_EMAIL, VALID_PASSWORD)
            .await
            .expect("login");

        let response = logout(
            Extension(Arc::new(protocol)),
            bearer(&tokens.refresh_token),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
