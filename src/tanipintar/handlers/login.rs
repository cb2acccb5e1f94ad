use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::auth::RotationProtocol;

use super::{auth_error_response, valid_email, ErrorBody, TokenPairBody};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful, returns a token pair", body = TokenPairBody, content_type = "application/json"),
        (status = 400, description = "Missing or invalid payload", body = ErrorBody),
        (status = 401, description = "Wrong password", body = ErrorBody),
        (status = 404, description = "Email not registered", body = ErrorBody),
    ),
    tag = "auth",
)]
#[instrument(skip(protocol, payload))]
pub async fn login(
    Extension(protocol): Extension<Arc<RotationProtocol>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                message: "Missing payload".to_string(),
                code: None,
            }),
        )
            .into_response();
    };

    if !valid_email(&request.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                message: "Invalid email format".to_string(),
                code: None,
            }),
        )
            .into_response();
    }

    match protocol.login(&request.email, &request.password).await {
        Ok((tokens, identity)) => {
            debug!("Login issued a new session for user {}", identity.id);
            let body = TokenPairBody::new("Login successful", tokens, Some(&identity));
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => auth_error_response(&err).into_response(),
    }
}
