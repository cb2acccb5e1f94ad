use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth::RotationProtocol;

use super::{auth_error_response, ErrorBody, TokenPairBody};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = RefreshRequest,
    responses (
        (status = 200, description = "Token pair rotated", body = TokenPairBody, content_type = "application/json"),
        (status = 401, description = "Refresh token malformed, expired or of the wrong type", body = ErrorBody),
        (status = 403, description = "Refresh token already used, revoked or lost a rotation race", body = ErrorBody),
        (status = 503, description = "Revocation store unavailable", body = ErrorBody),
    ),
    tag = "auth",
)]
#[instrument(skip(protocol, payload))]
pub async fn refresh(
    Extension(protocol): Extension<Arc<RotationProtocol>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                message: "Missing refresh token".to_string(),
                code: None,
            }),
        )
            .into_response();
    };

    match protocol.refresh(&request.refresh_token).await {
        Ok((tokens, _identity)) => {
            let body = TokenPairBody::new("Token refresh successful", tokens, None);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => auth_error_response(&err).into_response(),
    }
}
